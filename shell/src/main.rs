use clap::Parser;
use sandsh::{Shell, ShellError};
use sandsh_config::{LogFormat, SandshConfig};
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// sandsh - Sandboxed POSIX-like shell over an in-memory filesystem
#[derive(Parser, Debug)]
#[command(name = "sandsh", version, about)]
struct Args {
    /// Execute command and exit
    #[arg(short = 'c')]
    command: Option<String>,

    /// Configuration file
    #[arg(long, env = "SANDSH_CONFIG")]
    config: Option<String>,

    /// Script file to execute inside the sandbox
    script: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => sandsh_config::load_from_file(path)?,
        None => sandsh_config::load().unwrap_or_else(|e| {
            eprintln!("sandsh: config error: {}, using defaults", e);
            SandshConfig::default()
        }),
    };

    init_tracing(&config);

    let mut shell = Shell::new();
    for (name, value) in &config.shell.env {
        shell.set_var(name, value);
    }

    for cmd in &config.shell.startup {
        match shell.execute(cmd).await {
            Ok(_) => {}
            Err(ShellError::Exit(code)) => std::process::exit(code),
            Err(e) => warn!(command = %cmd, error = %e, "startup command failed"),
        }
    }

    if let Some(command) = args.command {
        // Execute command from -c argument
        match shell.execute(&command).await {
            Ok(code) => std::process::exit(code),
            Err(ShellError::Exit(code)) => std::process::exit(code),
            Err(e) => {
                eprintln!("sandsh: {}", e);
                std::process::exit(1);
            }
        }
    } else if let Some(script_path) = args.script {
        // Script file lives on the host; its commands run in the sandbox
        match std::fs::read_to_string(&script_path) {
            Ok(content) => match shell.execute(&content).await {
                Ok(code) => std::process::exit(code),
                Err(ShellError::Exit(code)) => std::process::exit(code),
                Err(e) => {
                    eprintln!("sandsh: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("sandsh: cannot read '{}': {}", script_path, e);
                std::process::exit(1);
            }
        }
    } else {
        run_repl(&mut shell, &config.shell).await?;
    }

    Ok(())
}

fn init_tracing(config: &SandshConfig) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if config.logging.filter.is_empty() {
        format!("sandsh={}", config.logging.level.as_str())
    } else {
        config.logging.filter.clone()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Get current time as HH:MM:SS
fn get_prompt_time() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => {
            let total_secs = duration.as_secs();
            let secs_today = total_secs % 86400;
            let hours = secs_today / 3600;
            let minutes = (secs_today % 3600) / 60;
            let seconds = secs_today % 60;
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
        Err(_) => "00:00:00".to_string(),
    }
}

/// Get current date as YYYY-MM-DD
fn get_prompt_date() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => {
            let total_secs = duration.as_secs();
            let days_since_epoch = total_secs / 86400;

            let mut year = 1970;
            let mut remaining_days = days_since_epoch as i32;

            loop {
                let days_in_year = if is_leap_year(year) { 366 } else { 365 };
                if remaining_days < days_in_year {
                    break;
                }
                remaining_days -= days_in_year;
                year += 1;
            }

            let days_in_months = if is_leap_year(year) {
                [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
            } else {
                [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
            };

            let mut month = 1;
            let mut day = remaining_days + 1;

            for &days_in_month in &days_in_months {
                if day <= days_in_month {
                    break;
                }
                day -= days_in_month;
                month += 1;
            }

            format!("{:04}-{:02}-{:02}", year, month, day)
        }
        Err(_) => "1970-01-01".to_string(),
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn render_prompt(template: &str, cwd: &str, last_exit_code: i32) -> String {
    template
        .replace("{cwd}", cwd)
        .replace("{time}", &get_prompt_time())
        .replace("{date}", &get_prompt_date())
        .replace("{status}", &last_exit_code.to_string())
        .replace("{red}", "\x1b[31m")
        .replace("{green}", "\x1b[32m")
        .replace("{blue}", "\x1b[34m")
        .replace("{yellow}", "\x1b[33m")
        .replace("{cyan}", "\x1b[36m")
        .replace("{bold}", "\x1b[1m")
        .replace("{reset}", "\x1b[0m")
}

async fn run_repl(
    shell: &mut Shell,
    shell_config: &sandsh_config::ShellConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use rustyline::error::ReadlineError;
    use rustyline::{Config, DefaultEditor};

    let rl_config = Config::builder()
        .max_history_size(shell_config.history.max_entries)?
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .build();

    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_file = &shell_config.history.file;
    let history_path = if let Some(stripped) = history_file.strip_prefix("~/") {
        dirs_home().join(stripped)
    } else {
        std::path::PathBuf::from(history_file)
    };
    if shell_config.history.enabled {
        let _ = rl.load_history(&history_path);
    }

    println!("sandsh v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' to quit, 'help' for help.");
    println!();

    let mut last_exit_code = 0;

    loop {
        let prompt = render_prompt(&shell_config.prompt, &shell.vfs.cwd(), last_exit_code);

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if line == "exit" || line == "quit" {
                    break;
                }

                // A bare runtime name drops into that runtime's REPL
                if let Some(runtime) = shell.runtime(line) {
                    if let Some(session) = runtime.create_repl() {
                        run_runtime_repl(&mut rl, session).await?;
                        continue;
                    }
                }

                match shell.execute(line).await {
                    Ok(code) => {
                        last_exit_code = code;
                    }
                    Err(ShellError::Exit(code)) => {
                        if shell_config.history.enabled {
                            let _ = rl.save_history(&history_path);
                        }
                        std::process::exit(code);
                    }
                    Err(e) => {
                        eprintln!("sandsh: {}", e);
                        last_exit_code = 1;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                last_exit_code = 130;
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if shell_config.history.enabled {
        let _ = rl.save_history(&history_path);
    }

    Ok(())
}

/// Interactive sub-REPL for a registered language runtime. Returns to
/// the shell prompt on Ctrl-D or `exit`.
async fn run_runtime_repl(
    rl: &mut rustyline::DefaultEditor,
    mut session: Box<dyn sandsh::ReplSession>,
) -> Result<(), Box<dyn std::error::Error>> {
    use rustyline::error::ReadlineError;

    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() {
            session.prompt()
        } else {
            "... ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if pending.is_empty() && line.trim() == "exit" {
                    break;
                }
                pending.push_str(&line);
                pending.push('\n');

                let outcome = session.execute(&pending).await;
                if outcome.continue_input {
                    continue;
                }
                pending.clear();

                if let Some(result) = outcome.result {
                    println!("{}", result);
                }
                if let Some(error) = outcome.error {
                    eprintln!("{}", error);
                }
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

fn dirs_home() -> std::path::PathBuf {
    env::var("HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
}
