use clap::Parser;
use miette::Result;
use rtk::cli::{Cli, Commands, GlobalOpts};
use rtk::core::{Config, LogFormat, Project};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    init_logging(&global);

    match cli.command {
        Commands::Init(args) => rtk::cli::commands::init::run(args, &global),
        Commands::Fmea(cmd) => rtk::cli::commands::fmea::run(cmd, &global),
        Commands::Config(cmd) => rtk::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => rtk::cli::commands::completions::run(args),
    }
}

/// Install the tracing subscriber, writing to stderr
fn init_logging(global: &GlobalOpts) {
    let project = match &global.project {
        Some(path) => Project::discover_from(path).ok(),
        None => Project::discover().ok(),
    };
    let config = Config::load_for(project.as_ref());

    let directive = if global.verbose && config.log_level.is_none() {
        "rtk=debug".to_string()
    } else {
        config.log_filter()
    };
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
