use env_logger::Env;
use log::info;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Rendering markdown...");
    banzai::run()
}
