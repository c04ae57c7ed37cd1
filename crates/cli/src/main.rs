use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use timedtext_common::{DEFAULT_TTL, Ttl, TtlParseError};
use timedtext_storage::{ShardedTimedText, TextStore, TimedText};

#[derive(Parser, Debug)]
#[command(name = "timedtext-cli", about = "REPL sobre um store de texto com TTL")]
struct Args {
    /// TTL das chaves: none, 400ms, 2s, 5m
    #[arg(long, default_value = DEFAULT_TTL, value_parser = parse_ttl)]
    ttl: Ttl,
    /// Usa o store particionado por shards
    #[arg(long)]
    sharded: bool,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn parse_ttl(s: &str) -> Result<Ttl, TtlParseError> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timedtext_cli=info,timedtext_storage=info".into()),
        )
        .init();

    let args = Args::parse();

    let store: Arc<dyn TextStore> = if args.sharded {
        Arc::new(ShardedTimedText::try_new(args.ttl)?)
    } else {
        Arc::new(TimedText::try_new(args.ttl)?)
    };
    info!("store criado (ttl: {}, sharded: {})", args.ttl, args.sharded);

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        println!("{}", execute(store.as_ref(), &args.command)?);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("timedtext> ");
        std::io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else {
            break; // EOF
        };

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        match execute(store.as_ref(), &tokens) {
            Ok(out) => println!("{out}"),
            Err(e) => println!("(error) {e}"),
        }
    }

    Ok(())
}

/// Executa um comando já tokenizado e devolve a resposta formatada.
fn execute(store: &dyn TextStore, tokens: &[String]) -> anyhow::Result<String> {
    let Some(cmd) = tokens.first() else {
        anyhow::bail!("comando vazio");
    };
    let args = &tokens[1..];

    match cmd.to_uppercase().as_str() {
        "APPEND" => {
            let (key, text) = key_and_text(cmd, args)?;
            let created = store.create_or_append(key, &text)?;
            Ok(if created { "(created)" } else { "(appended)" }.into())
        }
        "REPLACE" => {
            let (key, text) = key_and_text(cmd, args)?;
            let created = store.create_or_replace(key, &text);
            Ok(if created { "(created)" } else { "(replaced)" }.into())
        }
        "GET" => {
            let [key] = args else {
                anyhow::bail!("número errado de argumentos para '{cmd}'");
            };
            Ok(match store.get(key) {
                Some(value) => format!("{value:?}"),
                None => "(nil)".into(),
            })
        }
        "LEN" => Ok(format!("(integer) {}", store.len())),
        "PENDING" => Ok(format!("(integer) {}", store.pending_expirations())),
        "CANCEL" => {
            store.cancel_expirations();
            Ok("OK".into())
        }
        "TTL" => Ok(store.ttl().to_string()),
        _ => anyhow::bail!("comando desconhecido: {cmd}"),
    }
}

/// `APPEND key palavra palavra...`: o texto é o resto da linha unido por um
/// espaço simples. Para preservar espaços repetidos, use aspas:
/// `APPEND log "a    b"`.
fn key_and_text<'a>(cmd: &str, args: &'a [String]) -> anyhow::Result<(&'a str, String)> {
    match args {
        [key, rest @ ..] if !rest.is_empty() => Ok((key.as_str(), rest.join(" "))),
        _ => anyhow::bail!("número errado de argumentos para '{cmd}'"),
    }
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
                // Aspas vazias ainda geram um token
                if current.is_empty() {
                    tokens.push(String::new());
                }
            } else if c == '\\' {
                match chars.peek() {
                    Some(&next) if matches!(next, 'n' | 't' | '\\' | '"' | '\'') => {
                        current.push(match next {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        chars.next();
                    }
                    _ => current.push(c),
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
