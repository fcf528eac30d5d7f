use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::KeyEvent;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pure_steps::StepsOptions;
use pure_steps::document::{Node, Selection, bridge, html};
use pure_steps::editor::{DocumentEditor, InsertStepOptions, Shortcut};

const USAGE: &str = "\
Usage: pure-steps [--config <file.toml>] [--to html|json|ftml|md] [--strict] <input> [command...]

Commands are applied in order:
  toggle | set | unset          toggle, set or unset step lists
  insert | insert-before        insert a step after / before the current one
  remove                        remove the current step
  enter | backspace             press a key
  key:<shortcut>                press a shortcut, e.g. key:ctrl+alt+s
  cursor:<pos>                  place the cursor
  select:<anchor>:<head>        select a range
  all                           select the whole document
  type:<text>                   insert text at the selection";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Html,
    Json,
    Ftml,
    Markdown,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("html") | Some("htm") => DocumentFormat::Html,
            Some("json") => DocumentFormat::Json,
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            _ => DocumentFormat::Ftml,
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(DocumentFormat::Html),
            "json" => Ok(DocumentFormat::Json),
            "ftml" => Ok(DocumentFormat::Ftml),
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            other => Err(anyhow!("unknown output format {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Toggle,
    Set,
    Unset,
    Insert { before: bool },
    Remove,
    Enter,
    Backspace,
    Key(Shortcut),
    Cursor(usize),
    Select(usize, usize),
    All,
    Type(String),
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };
        let command = match (name, arg) {
            ("toggle", None) => Command::Toggle,
            ("set", None) => Command::Set,
            ("unset", None) => Command::Unset,
            ("insert", None) => Command::Insert { before: false },
            ("insert-before", None) => Command::Insert { before: true },
            ("remove", None) => Command::Remove,
            ("enter", None) => Command::Enter,
            ("backspace", None) => Command::Backspace,
            ("all", None) => Command::All,
            ("key", Some(shortcut)) => Command::Key(shortcut.parse()?),
            ("cursor", Some(pos)) => {
                Command::Cursor(pos.parse().with_context(|| format!("bad position in {s:?}"))?)
            }
            ("select", Some(range)) => {
                let (anchor, head) = range
                    .split_once(':')
                    .ok_or_else(|| anyhow!("expected select:<anchor>:<head>, got {s:?}"))?;
                Command::Select(
                    anchor.parse().with_context(|| format!("bad anchor in {s:?}"))?,
                    head.parse().with_context(|| format!("bad head in {s:?}"))?,
                )
            }
            ("type", Some(text)) => Command::Type(text.to_string()),
            _ => bail!("unknown command {s:?}"),
        };
        Ok(command)
    }
}

impl Command {
    /// Returns `false` when the editor declined the command.
    fn apply(&self, editor: &mut DocumentEditor) -> bool {
        match self {
            Command::Toggle => editor.toggle_steps(),
            Command::Set => editor.set_steps(),
            Command::Unset => editor.unset_steps(),
            Command::Insert { before: false } => editor.insert_step(InsertStepOptions::default()),
            Command::Insert { before: true } => editor.insert_step(InsertStepOptions::before()),
            Command::Remove => editor.remove_step(),
            Command::Enter => editor.handle_enter(),
            Command::Backspace => editor.handle_backspace(),
            Command::Key(shortcut) => {
                editor.handle_key_event(&KeyEvent::new(shortcut.code, shortcut.modifiers))
            }
            Command::Cursor(pos) => {
                editor.move_to(*pos);
                true
            }
            Command::Select(anchor, head) => {
                editor.set_selection(Selection::range(*anchor, *head));
                true
            }
            Command::All => {
                editor.select_all();
                true
            }
            Command::Type(text) => editor.insert_text(text),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    output: Option<DocumentFormat>,
    strict: bool,
    input: Option<PathBuf>,
    commands: Vec<Command>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--to" => {
                let format = args.next().context("--to needs a format")?;
                parsed.output = Some(format.parse()?);
            }
            "--strict" => parsed.strict = true,
            _ if parsed.input.is_none() => parsed.input = Some(PathBuf::from(arg)),
            _ => parsed.commands.push(arg.parse()?),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    run()
}

fn run() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let Some(path) = args.input.as_deref() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let options = match &args.config {
        Some(config) => StepsOptions::load(config)
            .with_context(|| format!("failed to load config {}", config.display()))?,
        None => StepsOptions::default(),
    };

    let format = DocumentFormat::from_path(path);
    let document = load_document(path, format, &options)?;
    let mut editor = DocumentEditor::with_options(document, options);

    for command in &args.commands {
        if !command.apply(&mut editor) {
            if args.strict {
                bail!("command {command:?} did not apply");
            }
            warn!(?command, "command did not apply");
        }
    }

    let output = args.output.unwrap_or(DocumentFormat::Html);
    println!("{}", render(&editor, output)?);
    Ok(())
}

fn load_document(path: &Path, format: DocumentFormat, options: &StepsOptions) -> Result<Node> {
    if !path.exists() {
        info!("{} does not exist, starting with an empty document", path.display());
        return Ok(Node::doc(Vec::new()));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document = match format {
        DocumentFormat::Html => html::from_html_with(&content, options),
        DocumentFormat::Json => Node::from_json_str(&content),
        DocumentFormat::Ftml => bridge::parse_ftml(&content),
        DocumentFormat::Markdown => bridge::parse_markdown(&content),
    };
    document.with_context(|| format!("failed to parse {}", path.display()))
}

fn render(editor: &DocumentEditor, format: DocumentFormat) -> Result<String> {
    let output = match format {
        DocumentFormat::Html => editor.to_html(),
        DocumentFormat::Json => serde_json::to_string_pretty(&editor.to_json())
            .context("failed to render JSON")?,
        DocumentFormat::Ftml => {
            bridge::write_ftml(editor.document()).context("failed to render FTML")?
        }
        DocumentFormat::Markdown => {
            bridge::write_markdown(editor.document()).context("failed to render Markdown")?
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_script() {
        let parsed = args(&[
            "--to",
            "json",
            "recipe.html",
            "all",
            "toggle",
            "cursor:4",
            "select:2:9",
            "type:Hello: world",
            "key:ctrl+alt+s",
            "insert-before",
        ])
        .unwrap();
        assert_eq!(parsed.output, Some(DocumentFormat::Json));
        assert_eq!(parsed.input, Some(PathBuf::from("recipe.html")));
        assert_eq!(
            parsed.commands,
            vec![
                Command::All,
                Command::Toggle,
                Command::Cursor(4),
                Command::Select(2, 9),
                Command::Type("Hello: world".to_string()),
                Command::Key(Shortcut::new(
                    KeyCode::Char('s'),
                    KeyModifiers::CONTROL | KeyModifiers::ALT
                )),
                Command::Insert { before: true },
            ]
        );
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(args(&["doc.html", "explode"]).is_err());
        assert!(args(&["doc.html", "cursor:x"]).is_err());
        assert!(args(&["--to", "pdf", "doc.html"]).is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.HTML")), DocumentFormat::Html);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.mdown")), DocumentFormat::Markdown);
        assert_eq!(DocumentFormat::from_path(Path::new("a.ftml")), DocumentFormat::Ftml);
    }

    #[test]
    fn script_wraps_and_renders() {
        let document = html::from_html("<p>Preheat the oven</p>").unwrap();
        let mut editor = DocumentEditor::new(document);
        for command in ["all", "toggle"] {
            assert!(command.parse::<Command>().unwrap().apply(&mut editor));
        }
        let output = render(&editor, DocumentFormat::Html).unwrap();
        assert!(output.starts_with("<ol data-type=\"steps\">"));
        assert!(output.contains("Preheat the oven"));
    }
}
