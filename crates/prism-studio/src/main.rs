mod app;
mod camera;
mod config;
mod sky;

use anyhow::Result;
use winit::dpi::LogicalSize;

use prism_engine::device::GpuInit;
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::window::{Runtime, RuntimeConfig};

use crate::app::StudioApp;
use crate::config::{parse_args, Command, USAGE};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = match parse_args(std::env::args_os().skip(1))? {
        Command::Run(config) => config,
        Command::Help => {
            println!("{USAGE}");
            return Ok(());
        }
    };

    let runtime = RuntimeConfig {
        title: config.title.clone(),
        initial_size: LogicalSize::new(config.width, config.height),
    };

    Runtime::run(runtime, GpuInit::default(), StudioApp::new(config))
}
