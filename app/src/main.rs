use std::process::ExitCode;

use vista_app::{AppArgs, DefaultAppArgs, VisualizationApp};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    vista_graphics::init();
    vista_app::init();

    let args = DefaultAppArgs::parse();
    let result = VisualizationApp::new(&args).and_then(|mut app| {
        app.run(args.max_frames())?;
        app.shutdown()
    });

    match result {
        Ok(stats) => {
            log::info!("Done: {stats}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
