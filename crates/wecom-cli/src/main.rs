//! CLI interface for wecom - WeCom application messages from the terminal.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Read as _};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug};
use serde_json::json;
use wecom_core::paths::write_default_config;
use wecom_core::schema::generate_schema;
use wecom_core::{AppConfig, AppPaths, MediaType, Recipient, TextCard, WecomClient};

const APP_NAME: &str = "wecom";

/// Repository URL for the printed schema's `$id`.
const REPO_URL: &str = "https://github.com/byteowlz/wecom";

fn main() -> anyhow::Result<()> {
    try_main()
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone(), cli.command.writes_default_config())?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Send { to, subcommand } => rt.block_on(handle_send(&ctx, &to, subcommand)),
        Command::Upload {
            path,
            media_type,
            content_type,
            name,
        } => rt.block_on(handle_upload(&ctx, &path, media_type, content_type, name)),
        Command::UploadHtml { path, name } => rt.block_on(handle_upload_html(&ctx, &path, name)),
        Command::Media { subcommand } => rt.block_on(handle_media(&ctx, subcommand)),
        Command::Token => rt.block_on(handle_token(&ctx)),
        Command::Alias { name, users } => handle_alias(&ctx, &name, &users),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "wecom",
    author,
    version,
    about = "Send WeCom application messages from the terminal",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

/// Common CLI options shared across all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Override the config file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Reduce output to only errors.
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Enable trace logging.
    #[arg(long, global = true)]
    pub trace: bool,
    /// Output machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    pub no_color: bool,
    /// Control color output.
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    pub color: ColorOption,
    /// Do not change anything on disk or send anything.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Assume "yes" for interactive prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Detect terminal capabilities automatically.
    Auto,
    /// Always emit ANSI color codes.
    Always,
    /// Never emit ANSI color codes.
    Never,
}

/// Message recipients. Defaults to `api.default_recipient` when none is given.
#[derive(Debug, Clone, Args)]
struct RecipientArgs {
    /// User id or recipient alias (repeatable, `@all` for everyone).
    #[arg(short, long = "to", value_name = "USER", global = true)]
    to: Vec<String>,
    /// Department id (repeatable).
    #[arg(long = "party", value_name = "ID", global = true)]
    parties: Vec<String>,
    /// Tag id (repeatable).
    #[arg(long = "tag", value_name = "ID", global = true)]
    tags: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message.
    Send {
        #[command(flatten)]
        to: RecipientArgs,
        #[command(subcommand)]
        subcommand: SendSubcommand,
    },
    /// Upload a temporary media file (expires after 3 days).
    Upload {
        /// File to upload.
        path: PathBuf,
        /// Media type: image, voice, video, file. Guessed from the extension when omitted.
        #[arg(short = 't', long = "type")]
        media_type: Option<MediaType>,
        /// MIME type. Guessed from the extension when omitted.
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,
        /// File name reported to the server. Defaults to the file's name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Upload an HTML document as a file.
    UploadHtml {
        /// HTML file to upload, or `-` for stdin.
        path: PathBuf,
        /// File name reported to the server (`.html` is appended).
        #[arg(long)]
        name: Option<String>,
    },
    /// Temporary media access.
    Media {
        #[command(subcommand)]
        subcommand: MediaSubcommand,
    },
    /// Print a freshly fetched access token.
    Token,
    /// Create a recipient alias (written to config.toml).
    Alias {
        /// Short alias name (e.g., "ops").
        name: String,
        /// User ids the alias expands to.
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Create config directories and default files.
    Init(InitCommand),
    /// Inspect and manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// `init` decides for itself whether the config file may be written.
    const fn writes_default_config(&self) -> bool {
        !matches!(self, Self::Init(_))
    }
}

#[derive(Debug, Clone, Subcommand)]
enum SendSubcommand {
    /// Send plain text. Use `-` to read from stdin.
    Text {
        /// Message text.
        text: String,
        /// Split oversized text into several messages.
        #[arg(long)]
        split: bool,
        /// Chunk size in bytes when splitting (default: api.max_content_bytes).
        #[arg(long, value_name = "BYTES", requires = "split")]
        max_bytes: Option<usize>,
    },
    /// Send markdown (rendered in the WeCom app only). Use `-` to read from stdin.
    Markdown {
        /// Markdown text.
        text: String,
    },
    /// Send a text card.
    Card {
        /// Card title (max 128 bytes).
        #[arg(long)]
        title: String,
        /// Card description (max 512 bytes).
        #[arg(long)]
        description: String,
        /// Link opened on click (max 2048 bytes).
        #[arg(long)]
        url: String,
        /// Button text.
        #[arg(long)]
        button: Option<String>,
    },
    /// Upload and send an image (JPG or PNG).
    Image {
        /// Image file.
        #[arg(required_unless_present = "base64", conflicts_with = "base64")]
        path: Option<PathBuf>,
        /// Base64-encoded image instead of a file.
        #[arg(long, value_name = "B64")]
        base64: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum MediaSubcommand {
    /// Print the download URL of a media id.
    Url {
        /// Media id returned by an upload.
        media_id: String,
    },
    /// Download a media item.
    Get {
        /// Media id returned by an upload.
        media_id: String,
        /// Output file.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists.
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration (secret masked).
    Show,
    /// Print the resolved config file path.
    Path,
    /// Print all resolved paths.
    Paths,
    /// Print the JSON schema.
    Schema,
    /// Regenerate the default configuration file.
    Reset,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts, write_default_config: bool) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = load_config(&paths, common.dry_run, write_default_config)?;
        let paths = paths.apply_overrides(&config)?;
        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        if let Some(ref file) = self.config.logging.file {
            let path = self.paths.log_file(file);
            let target = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(target)));
            builder.write_style(WriteStyle::Never);
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            if disable_color {
                builder.write_style(WriteStyle::Never);
            } else if force_color {
                builder.write_style(WriteStyle::Always);
            } else {
                builder.write_style(WriteStyle::Auto);
            }
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    const fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.to_level_filter(),
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn ensure_directories(&self) -> Result<()> {
        if self.common.dry_run {
            self.paths.log_dry_run();
            return Ok(());
        }
        self.paths.ensure_directories()
    }

    fn client(&self) -> Result<WecomClient> {
        WecomClient::from_config(&self.config).map_err(|e| {
            anyhow!(
                "{e}. Set it in {} or via WECOM_API__* environment variables.",
                self.paths.config_file.display()
            )
        })
    }

    /// Build the recipient from CLI flags, expanding aliases from config.
    fn resolve_recipient(&self, args: &RecipientArgs) -> Recipient {
        if args.to.is_empty() && args.parties.is_empty() && args.tags.is_empty() {
            return Recipient::user(self.config.api.default_recipient.clone());
        }
        let users: Vec<&str> = args
            .to
            .iter()
            .map(|name| self.config.resolve_alias(name).unwrap_or(name))
            .collect();
        Recipient::users(&users)
            .with_parties(&args.parties)
            .with_tags(&args.tags)
    }

    fn print_result<T: serde::Serialize>(&self, value: &T, human: &str) -> Result<()> {
        if self.common.json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).context("serializing response to JSON")?
            );
        } else {
            println!("{human}");
        }
        Ok(())
    }
}

/// Load configuration, creating the default file first unless told not to.
fn load_config(paths: &AppPaths, dry_run: bool, write_default: bool) -> Result<AppConfig> {
    if write_default {
        AppConfig::load(paths, dry_run)
    } else {
        AppConfig::load_from_path(&paths.config_file)
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn handle_send(ctx: &RuntimeContext, to: &RecipientArgs, cmd: SendSubcommand) -> Result<()> {
    let recipient = ctx.resolve_recipient(to);

    if ctx.common.dry_run {
        log::info!("dry-run: would send {cmd:?} to {recipient:?}");
        return Ok(());
    }

    let client = ctx.client()?;

    match cmd {
        SendSubcommand::Text {
            text,
            split,
            max_bytes,
        } => {
            let text = read_text_arg(&text)?;
            if split {
                let responses = client
                    .send_text_autosplit(&text, &recipient, max_bytes)
                    .await?;
                let human = format!("Sent {} messages.", responses.len());
                ctx.print_result(&responses, &human)
            } else {
                let resp = client.send_text(&text, &recipient).await?;
                ctx.print_result(&resp, "Sent.")
            }
        }
        SendSubcommand::Markdown { text } => {
            let text = read_text_arg(&text)?;
            let resp = client.send_markdown(&text, &recipient).await?;
            ctx.print_result(&resp, "Sent.")
        }
        SendSubcommand::Card {
            title,
            description,
            url,
            button,
        } => {
            let mut card = TextCard::new(title, description, url);
            if let Some(button) = button {
                card = card.with_button(button);
            }
            let resp = client.send_textcard(&card, &recipient).await?;
            ctx.print_result(&resp, "Sent.")
        }
        SendSubcommand::Image { path, base64 } => {
            let resp = if let Some(encoded) = base64 {
                client.send_image_base64(&encoded, &recipient).await?
            } else {
                let path = path.ok_or_else(|| anyhow!("an image path or --base64 is required"))?;
                let content = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                client
                    .send_image(&content, &file_name_of(&path)?, &recipient)
                    .await?
            };
            ctx.print_result(&resp, "Sent.")
        }
    }
}

async fn handle_upload(
    ctx: &RuntimeContext,
    path: &Path,
    media_type: Option<MediaType>,
    content_type: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let media_type = media_type.unwrap_or_else(|| media_type_for_ext(&ext));
    let content_type = content_type.unwrap_or_else(|| mime_for_ext(&ext).to_string());
    let name = match name {
        Some(name) => name,
        None => file_name_of(path)?,
    };

    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    if ctx.common.dry_run {
        log::info!(
            "dry-run: would upload {name} as {media_type} ({} bytes, {content_type})",
            content.len()
        );
        return Ok(());
    }

    let client = ctx.client()?;
    eprint!("Uploading {name}... ");
    let uploaded = client
        .upload_temp_media(&name, &content, &content_type, media_type)
        .await?;
    eprintln!("done.");
    ctx.print_result(&uploaded, &uploaded.media_id)
}

async fn handle_upload_html(ctx: &RuntimeContext, path: &Path, name: Option<String>) -> Result<()> {
    let is_stdin = path.as_os_str() == "-";
    let content = if is_stdin {
        read_stdin()?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };
    let name = match name {
        Some(name) => name,
        None if is_stdin => "page".to_string(),
        None => file_name_of(path)?,
    };

    if ctx.common.dry_run {
        log::info!("dry-run: would upload {name} ({} bytes)", content.len());
        return Ok(());
    }

    let client = ctx.client()?;
    let uploaded = client.upload_html(&name, &content).await?;
    ctx.print_result(&uploaded, &uploaded.media_id)
}

async fn handle_media(ctx: &RuntimeContext, cmd: MediaSubcommand) -> Result<()> {
    if ctx.common.dry_run {
        log::info!("dry-run: would run media {cmd:?}");
        return Ok(());
    }

    let client = ctx.client()?;
    match cmd {
        MediaSubcommand::Url { media_id } => {
            let url = client.temp_media_url(&media_id).await?;
            ctx.print_result(&json!({ "media_id": media_id, "url": url }), &url)
        }
        MediaSubcommand::Get { media_id, output } => {
            let bytes = client.download_temp_media(&media_id).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("writing {}", output.display()))?;
            let human = format!("Wrote {} bytes to {}.", bytes.len(), output.display());
            ctx.print_result(
                &json!({ "media_id": media_id, "path": output, "bytes": bytes.len() }),
                &human,
            )
        }
    }
}

async fn handle_token(ctx: &RuntimeContext) -> Result<()> {
    let client = ctx.client()?;
    let token = client.access_token().await?;
    ctx.print_result(&json!({ "access_token": token }), &token)
}

fn handle_alias(ctx: &RuntimeContext, name: &str, users: &[String]) -> Result<()> {
    let value = Recipient::users(users).touser;
    if ctx.common.dry_run {
        log::info!("dry-run: would alias {name} = {value}");
        return Ok(());
    }
    AppConfig::add_alias(&ctx.paths.config_file, name, &value)?;
    println!("Alias '{name}' -> {value}");
    Ok(())
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }
    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let shown = ctx.config.redacted();
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&shown).context("serializing config to JSON")?
                );
            } else {
                println!("{shown:#?}");
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Paths => {
            if ctx.common.json {
                let paths = json!({
                    "config": ctx.paths.config_file,
                    "state": ctx.paths.state_dir,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&paths).context("serializing paths to JSON")?
                );
            } else {
                println!("config: {}", ctx.paths.config_file.display());
                println!("state:  {}", ctx.paths.state_dir.display());
            }
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", generate_schema(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Return the argument itself, or stdin when it is `-`.
fn read_text_arg(arg: &str) -> Result<String> {
    if arg == "-" { read_stdin() } else { Ok(arg.to_string()) }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    Ok(buf)
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))
}

/// Pick the upload media type for a file extension.
fn media_type_for_ext(ext: &str) -> MediaType {
    match ext {
        "jpg" | "jpeg" | "png" => MediaType::Image,
        "amr" => MediaType::Voice,
        "mp4" => MediaType::Video,
        _ => MediaType::File,
    }
}

/// Map a file extension to a MIME type.
fn mime_for_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "amr" => "audio/amr",
        "mp4" => "video/mp4",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_send_text_with_recipients() {
        let cli = Cli::try_parse_from([
            "wecom", "send", "--to", "ops", "--to", "lisi", "--party", "2", "text", "hello",
            "--split", "--max-bytes", "100",
        ])
        .expect("parse");
        match cli.command {
            Command::Send { to, subcommand } => {
                assert_eq!(to.to, vec!["ops", "lisi"]);
                assert_eq!(to.parties, vec!["2"]);
                assert!(matches!(
                    subcommand,
                    SendSubcommand::Text { split: true, max_bytes: Some(100), .. }
                ));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn max_bytes_requires_split() {
        let res = Cli::try_parse_from(["wecom", "send", "text", "hi", "--max-bytes", "10"]);
        assert!(res.is_err());
    }

    #[test]
    fn image_needs_path_or_base64() {
        assert!(Cli::try_parse_from(["wecom", "send", "image"]).is_err());
        assert!(Cli::try_parse_from(["wecom", "send", "image", "--base64", "AAAA"]).is_ok());
    }

    #[test]
    fn upload_type_parses_media_type() {
        let cli = Cli::try_parse_from(["wecom", "upload", "a.bin", "--type", "voice"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Upload { media_type: Some(MediaType::Voice), .. }
        ));
        assert!(Cli::try_parse_from(["wecom", "upload", "a.bin", "--type", "gif"]).is_err());
    }

    #[test]
    fn init_force_is_not_the_global_yes_flag() {
        let cli = Cli::try_parse_from(["wecom", "init", "--force"]).expect("parse");
        assert!(!cli.common.assume_yes);
        assert!(matches!(cli.command, Command::Init(InitCommand { force: true })));

        let cli = Cli::try_parse_from(["wecom", "-y", "init"]).expect("parse");
        assert!(cli.common.assume_yes);
        assert!(matches!(cli.command, Command::Init(InitCommand { force: false })));
    }

    #[test]
    fn only_init_skips_default_config() {
        let init = Cli::try_parse_from(["wecom", "init"]).expect("parse");
        assert!(!init.command.writes_default_config());
        let token = Cli::try_parse_from(["wecom", "token"]).expect("parse");
        assert!(token.command.writes_default_config());
    }

    fn context_in(dir: &Path, args: &[&str]) -> RuntimeContext {
        let cli = Cli::try_parse_from(args).expect("parse");
        let paths = AppPaths {
            config_file: dir.join("config.toml"),
            state_dir: dir.join("state"),
        };
        let config = load_config(&paths, false, cli.command.writes_default_config())
            .expect("load config");
        RuntimeContext {
            common: cli.common,
            paths,
            config,
        }
    }

    #[test]
    fn init_writes_config_on_first_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context_in(dir.path(), &["wecom", "init"]);
        assert!(!ctx.paths.config_file.exists());

        handle_init(&ctx, InitCommand { force: false }).expect("first init");
        assert!(ctx.paths.config_file.exists());

        let err = handle_init(&ctx, InitCommand { force: false }).expect_err("exists");
        assert!(err.to_string().contains("--force"));
        handle_init(&ctx, InitCommand { force: true }).expect("forced init");
    }

    #[test]
    fn other_commands_create_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context_in(dir.path(), &["wecom", "token"]);
        assert!(ctx.paths.config_file.exists());
    }

    #[test]
    fn recipient_defaults_without_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context_in(dir.path(), &["wecom", "init"]);
        assert!(ctx.client().is_err());

        let none = RecipientArgs {
            to: Vec::new(),
            parties: Vec::new(),
            tags: Vec::new(),
        };
        assert_eq!(ctx.resolve_recipient(&none).touser, "@all");
    }

    #[tokio::test]
    async fn dry_run_send_and_media_need_no_credentials() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context_in(dir.path(), &["wecom", "--dry-run", "init"]);
        let none = RecipientArgs {
            to: Vec::new(),
            parties: Vec::new(),
            tags: Vec::new(),
        };

        let text = SendSubcommand::Text {
            text: "hi".to_string(),
            split: false,
            max_bytes: None,
        };
        handle_send(&ctx, &none, text).await.expect("dry-run send");
        let url = MediaSubcommand::Url {
            media_id: "MEDIA".to_string(),
        };
        handle_media(&ctx, url).await.expect("dry-run media");
    }

    #[test]
    fn guesses_media_type_and_mime() {
        assert_eq!(media_type_for_ext("png"), MediaType::Image);
        assert_eq!(media_type_for_ext("amr"), MediaType::Voice);
        assert_eq!(media_type_for_ext("pdf"), MediaType::File);
        assert_eq!(mime_for_ext("jpg"), "image/jpeg");
        assert_eq!(mime_for_ext("weird"), "application/octet-stream");
    }
}
