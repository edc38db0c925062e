use rocket::launch;

#[launch]
async fn rocket() -> _ {
    env_logger::init();

    stave::create_rocket()
}
