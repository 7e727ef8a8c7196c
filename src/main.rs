use std::io::{self, BufRead, Read, Write};

use anyhow::Result;
use clap::Parser;
use llm_line_translator::{OpenAI, Translator};

#[derive(Parser, Debug)]
#[command(
    name = "llm-line-translator",
    version,
    about = "Translate text line by line into every configured language"
)]
struct Cli {
    /// Language to display (default: settings default_lang)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Model id (overrides settings [openai] model)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides OPENAI_API_KEY and the stored key)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Store an API key in the local credential store and exit
    #[arg(long = "save-key")]
    save_key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show the language catalog and exit
    #[arg(long = "show-enabled-languages")]
    show_enabled_languages: bool,

    /// Print the result of every language, not only the active one
    #[arg(long = "all")]
    all: bool,

    /// Append token usage to output
    #[arg(long = "with-using-tokens")]
    with_using_tokens: bool,

    /// Append model name to output
    #[arg(long = "with-using-model")]
    with_using_model: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Interactive mode
    #[arg(short = 'i', long = "interactive")]
    interactive: bool,
}

impl Cli {
    fn config(&self) -> llm_line_translator::Config {
        llm_line_translator::Config {
            lang: self.lang.clone(),
            model: self.model.clone(),
            key: self.key.clone(),
            settings_path: self.read_settings.clone(),
            show_enabled_languages: self.show_enabled_languages,
            all_languages: self.all,
            with_using_tokens: self.with_using_tokens,
            with_using_model: self.with_using_model,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_line_translator::logging::init(cli.verbose)?;

    if let Some(key) = cli.save_key.as_deref() {
        llm_line_translator::credential::save_credential(key)?;
        println!("key stored");
        return Ok(());
    }
    if cli.interactive {
        return run_interactive(cli).await;
    }

    let input = if cli.show_enabled_languages {
        None
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Some(buffer)
    };

    let output = llm_line_translator::run(cli.config(), input).await?;
    print_diagnostics(&output.diagnostics);
    println!("{}", output.text);
    Ok(())
}

fn print_diagnostics(diagnostics: &[String]) {
    for message in diagnostics {
        eprintln!("error: {}", message);
    }
}

struct InteractiveState {
    config: llm_line_translator::Config,
    translator: Translator<OpenAI>,
    buffer: Vec<String>,
}

async fn run_interactive(cli: Cli) -> Result<()> {
    let config = cli.config();
    let translator = llm_line_translator::build_translator(&config)?;
    let mut state = InteractiveState {
        config,
        translator,
        buffer: Vec::new(),
    };
    println!("Interactive mode. Use /quit or /exit to finish.");
    println!("Type lines to translate, then /run. Type /help to see available commands.");

    let mut line = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    loop {
        line.clear();
        print!("[{}]> ", state.translator.current_lang());
        io::stdout().flush()?;
        if stdin_lock.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']);
        if input.trim().starts_with('/') {
            if handle_interactive_command(input.trim(), &mut state).await? {
                break;
            }
            continue;
        }
        state.buffer.push(input.to_string());
    }
    Ok(())
}

async fn handle_interactive_command(input: &str, state: &mut InteractiveState) -> Result<bool> {
    if matches!(input, "/quit" | "/exit") {
        return Ok(true);
    }
    if input == "/help" {
        print_interactive_help();
        return Ok(false);
    }
    if input == "/run" {
        let text = state.buffer.join("\n");
        state.buffer.clear();
        let result = state.translator.translate_all(&text).await;
        print_diagnostics(state.translator.diagnostics());
        match result {
            Ok(output) => println!("{}", output),
            Err(err) => eprintln!("error: {}", err),
        }
        return Ok(false);
    }
    if input == "/clear" {
        state.buffer.clear();
        println!("input cleared");
        return Ok(false);
    }
    if input == "/langs" {
        println!(
            "{}",
            llm_line_translator::format_show_output(&state.translator)
        );
        return Ok(false);
    }
    if input == "/all" {
        println!(
            "{}",
            llm_line_translator::format_all_languages(&mut state.translator)
        );
        return Ok(false);
    }
    if input == "/log" {
        if state.translator.diagnostics().is_empty() {
            println!("no errors");
        } else {
            print_diagnostics(state.translator.diagnostics());
        }
        return Ok(false);
    }
    if let Some(arg) = input.strip_prefix("/lang") {
        let value = arg.trim();
        if value.is_empty() {
            let code = state.translator.current_lang();
            let name = state.translator.settings().languages.name(code).unwrap_or("?");
            println!("lang: {} ({})", code, name);
            return Ok(false);
        }
        if !state.translator.settings().languages.contains(value) {
            eprintln!("unknown language code: {}", value);
            return Ok(false);
        }
        let output = state.translator.select_language(value);
        println!("{}", output);
        return Ok(false);
    }
    if let Some(arg) = input.strip_prefix("/key") {
        let value = arg.trim();
        if value.is_empty() {
            let status = if state.translator.provider().has_credential() {
                "(set)"
            } else {
                "(none)"
            };
            println!("key: {}", status);
        } else {
            llm_line_translator::credential::save_credential(value)?;
            state.config.key = Some(value.to_string());
            state.config.lang = Some(state.translator.current_lang().to_string());
            state.translator = llm_line_translator::build_translator(&state.config)?;
            println!("key stored");
        }
        return Ok(false);
    }

    eprintln!("unknown command: {}", input);
    Ok(false)
}

fn print_interactive_help() {
    println!("Commands:");
    println!("  /quit, /exit       Exit interactive mode");
    println!("  /run               Translate the lines typed so far");
    println!("  /clear             Discard the lines typed so far");
    println!("  /lang <code>       Show the cached result of a language (or show current)");
    println!("  /langs             Show the language catalog");
    println!("  /all               Show the cached result of every language");
    println!("  /log               Show errors of the last run");
    println!("  /key <api-key>     Store an API key and use it from now on");
}
