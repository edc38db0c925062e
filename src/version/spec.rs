//! Classification of `name@spec` arguments the way npm clients send them.

use crate::error::{RegistryError, RegistryResult};
use crate::version::padding::parse_strict;
use crate::version::range::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecKind {
    Tag(String),
    /// Normalised exact version.
    Version(String),
    Range(String),
    Alias(Box<PackageSpec>),
    /// git, remote tarball, file or directory specs; never served by the registry.
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub raw_spec: String,
    pub kind: SpecKind,
}

impl PackageSpec {
    /// Parses `spec` for the package `name`. An empty spec means the `latest` tag.
    pub fn parse(name: &str, spec: &str) -> RegistryResult<Self> {
        let raw_spec = spec.trim().to_string();
        let kind = classify(&raw_spec)?;
        Ok(Self {
            name: name.to_string(),
            raw_spec,
            kind,
        })
    }

    /// Parses a combined `name@spec` argument (`@scope/name@^1.0.0`, `foo`, ...).
    pub fn parse_arg(arg: &str) -> RegistryResult<Self> {
        let (name, spec) = split_name_and_spec(arg);
        if name.is_empty() {
            return Err(RegistryError::Unprocessable(format!(
                "missing package name in {arg}"
            )));
        }
        Self::parse(name, spec)
    }

    pub fn scope_and_name(&self) -> (String, String) {
        split_fullname(&self.name)
    }
}

/// `@scope/name` -> (`@scope`, `name`); unscoped names get an empty scope.
pub fn split_fullname(fullname: &str) -> (String, String) {
    match fullname.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, name)) => (format!("@{scope}"), name.to_string()),
        None => (String::new(), fullname.to_string()),
    }
}

pub fn fullname(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}/{name}")
    }
}

fn split_name_and_spec(arg: &str) -> (&str, &str) {
    // Skip the scope marker so `@scope/name` is not split on its first `@`.
    let search_from = usize::from(arg.starts_with('@'));
    match arg[search_from..].find('@') {
        Some(index) => {
            let at = index + search_from;
            (&arg[..at], &arg[at + 1..])
        }
        None => (arg, ""),
    }
}

fn classify(spec: &str) -> RegistryResult<SpecKind> {
    if let Some(aliased) = spec.strip_prefix("npm:") {
        let sub_spec = PackageSpec::parse_arg(aliased)?;
        if matches!(sub_spec.kind, SpecKind::Alias(_)) {
            return Err(RegistryError::Unprocessable(format!(
                "nested aliases are not supported: {spec}"
            )));
        }
        return Ok(SpecKind::Alias(Box::new(sub_spec)));
    }
    if let Some(kind) = unsupported_kind(spec) {
        return Ok(SpecKind::Unsupported(kind));
    }
    if spec.is_empty() {
        return Ok(SpecKind::Tag("latest".to_string()));
    }
    if let Some(version) = parse_strict(spec) {
        return Ok(SpecKind::Version(version.to_string()));
    }
    if Range::parse(spec).is_ok() {
        return Ok(SpecKind::Range(spec.to_string()));
    }
    if is_valid_tag(spec) {
        return Ok(SpecKind::Tag(spec.to_string()));
    }
    Err(RegistryError::Unprocessable(format!(
        "invalid tag name \"{spec}\": tags may not have any characters that encodeURIComponent encodes"
    )))
}

fn unsupported_kind(spec: &str) -> Option<&'static str> {
    const GIT_PREFIXES: [&str; 6] = ["git+", "git:", "github:", "gitlab:", "bitbucket:", "gist:"];
    if GIT_PREFIXES.iter().any(|prefix| spec.starts_with(prefix)) {
        return Some("git");
    }
    if spec.starts_with("http://") || spec.starts_with("https://") {
        return Some("remote");
    }
    if spec.starts_with("file:") || spec.ends_with(".tgz") || spec.ends_with(".tar.gz") {
        return Some("file");
    }
    if ["./", "../", "/", "~/"].iter().any(|prefix| spec.starts_with(prefix)) {
        return Some("directory");
    }
    // `user/repo` GitHub shorthand.
    if spec.contains('/') && !spec.contains(' ') {
        return Some("git");
    }
    None
}

fn is_valid_tag(tag: &str) -> bool {
    tag.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_registry_specs() {
        let spec = PackageSpec::parse("foo", "latest").unwrap();
        assert_eq!(spec.kind, SpecKind::Tag("latest".to_string()));

        let spec = PackageSpec::parse("foo", "=1.0.0").unwrap();
        assert_eq!(spec.kind, SpecKind::Version("1.0.0".to_string()));

        let spec = PackageSpec::parse("foo", "^1.0.0 || 2.x").unwrap();
        assert_eq!(spec.kind, SpecKind::Range("^1.0.0 || 2.x".to_string()));

        let spec = PackageSpec::parse("foo", "1.1").unwrap();
        assert_eq!(spec.kind, SpecKind::Range("1.1".to_string()));

        let spec = PackageSpec::parse("foo", "").unwrap();
        assert_eq!(spec.kind, SpecKind::Tag("latest".to_string()));
    }

    #[test]
    fn test_alias_spec() {
        let spec = PackageSpec::parse("my-foo", "npm:@scope/foo@^2.0.0").unwrap();
        match spec.kind {
            SpecKind::Alias(sub) => {
                assert_eq!(sub.name, "@scope/foo");
                assert_eq!(sub.kind, SpecKind::Range("^2.0.0".to_string()));
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_specs() {
        for (raw, kind) in [
            ("git+https://github.com/a/b.git", "git"),
            ("github:a/b", "git"),
            ("a/b", "git"),
            ("https://example.com/foo.tgz", "remote"),
            ("file:../foo", "file"),
            ("../foo", "directory"),
        ] {
            assert_eq!(
                PackageSpec::parse("foo", raw).unwrap().kind,
                SpecKind::Unsupported(kind),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_invalid_tag_is_rejected() {
        assert!(matches!(
            PackageSpec::parse("foo", "bad tag!?"),
            Err(RegistryError::Unprocessable(_))
        ));
    }

    #[test]
    fn test_parse_arg_and_fullname() {
        let spec = PackageSpec::parse_arg("@cnpm/foo@beta").unwrap();
        assert_eq!(spec.name, "@cnpm/foo");
        assert_eq!(spec.kind, SpecKind::Tag("beta".to_string()));
        assert_eq!(
            spec.scope_and_name(),
            ("@cnpm".to_string(), "foo".to_string())
        );

        let spec = PackageSpec::parse_arg("foo").unwrap();
        assert_eq!(spec.kind, SpecKind::Tag("latest".to_string()));
        assert_eq!(split_fullname("foo"), (String::new(), "foo".to_string()));
        assert_eq!(fullname("@cnpm", "foo"), "@cnpm/foo");
        assert_eq!(fullname("", "foo"), "foo");
    }
}
