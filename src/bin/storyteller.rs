//! CLI for Storyteller - Busan history content planning.

use anyhow::Context;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storyteller::credentials::CredentialProvider;
use storyteller::media::MediaType;
use storyteller::render::{download_file_name, render_session};
use storyteller::{
    KeySelector, Session, Settings, SharedCredentials, Step, StoryRequest, Storyteller,
    CONTENT_FORMATS,
};

#[derive(Parser)]
#[command(name = "storyteller")]
#[command(about = "Plan Busan history stories with Gemini and render them as posters or Veo videos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive wizard
    Run,

    /// Plan one story and generate its media
    Generate(GenerateArgs),

    /// List content formats
    Formats,
}

#[derive(Args)]
struct GenerateArgs {
    /// Place in Busan (e.g. 40계단)
    #[arg(long)]
    place: String,

    /// Emotion keyword (e.g. 그리움)
    #[arg(long)]
    emotion: String,

    /// Content format, see `storyteller formats`
    #[arg(long)]
    format: String,

    /// Directory to write plan.json and the media file into
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Asks for a key on the terminal when none is configured.
struct TerminalKeySelector {
    credentials: SharedCredentials,
}

#[async_trait]
impl KeySelector for TerminalKeySelector {
    async fn has_selected_key(&self) -> bool {
        self.credentials.api_key().is_some()
    }

    async fn open_select_key(&self) -> storyteller::Result<()> {
        eprintln!("Veo 영상 생성에는 결제가 활성화된 Gemini API 키가 필요합니다.");
        let key = read_line("API 키: ")
            .await
            .map_err(|e| storyteller::StoryError::Auth(e.to_string()))?;
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.credentials.set(key);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing()?;

    match cli.command {
        Commands::Run => {
            let settings = Settings::load(cli.config.as_deref())?;
            run_wizard(&settings, cli.json).await?;
        }
        Commands::Generate(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            generate(&settings, args, cli.json).await?;
        }
        Commands::Formats => {
            list_formats(cli.json)?;
        }
    }

    Ok(())
}

fn setup_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storyteller=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialise tracing: {err}"))?;
    Ok(())
}

/// Prints `label` and reads one trimmed line; `None` on end of input.
async fn read_line(label: &str) -> anyhow::Result<Option<String>> {
    eprint!("{label}");
    let line = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf).map(|n| (n > 0).then_some(buf))
    })
    .await??;
    Ok(line.map(|l| l.trim().to_string()))
}

async fn choose_format() -> anyhow::Result<Option<String>> {
    for (i, format) in CONTENT_FORMATS.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, format);
    }
    loop {
        let Some(answer) = read_line("콘텐츠 형식 번호: ").await? else {
            return Ok(None);
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=CONTENT_FORMATS.len()).contains(&n) => {
                return Ok(Some(CONTENT_FORMATS[n - 1].to_string()));
            }
            _ => eprintln!("1부터 {} 사이의 번호를 입력해주세요.", CONTENT_FORMATS.len()),
        }
    }
}

async fn run_wizard(settings: &Settings, json_output: bool) -> anyhow::Result<()> {
    let credentials = SharedCredentials::new();
    let app = Storyteller::from_settings(settings, Arc::new(credentials.clone()))
        .with_key_selector(Arc::new(TerminalKeySelector { credentials }));

    loop {
        eprint!("{}", render_session(&app.snapshot().await));
        let Some(place) = read_line("장소 (예: 40계단): ").await? else {
            break;
        };
        let Some(emotion) = read_line("감정 (예: 그리움): ").await? else {
            break;
        };
        let Some(content_type) = choose_format().await? else {
            break;
        };

        match submit_with_spinner(&app, StoryRequest::new(place, emotion, content_type)).await {
            Ok(session) => print_session(&session, json_output)?,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        }

        match read_line("새로운 기획을 시작할까요? [y/N]: ").await? {
            Some(answer) if answer.eq_ignore_ascii_case("y") => app.reset().await,
            _ => break,
        }
    }

    Ok(())
}

async fn generate(settings: &Settings, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let app = Storyteller::from_settings(settings, Arc::new(SharedCredentials::new()));
    let request = StoryRequest::new(args.place, args.emotion, args.format);
    let session = submit_with_spinner(&app, request).await?;

    print_session(&session, json_output)?;
    if session.step() == Step::Error {
        anyhow::bail!("story generation failed");
    }
    if let Some(dir) = &args.output {
        let written = save_outputs(&session, dir).await?;
        if !json_output {
            for path in written {
                println!("Saved: {}", path.display());
            }
        }
    }
    Ok(())
}

async fn submit_with_spinner(app: &Storyteller, request: StoryRequest) -> anyhow::Result<Session> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let ticker = tokio::spawn({
        let session = app.session();
        let spinner = spinner.clone();
        async move {
            loop {
                let message = session.lock().await.loading_message().replace('\n', " ");
                spinner.set_message(message);
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    });

    let result = app.submit(request).await;
    ticker.abort();
    spinner.finish_and_clear();
    Ok(result?)
}

fn print_session(session: &Session, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let result = serde_json::json!({
            "step": session.step(),
            "plan": session.plan(),
            "media": session.media(),
            "error": session.error(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_session(session));
    }
    Ok(())
}

/// Writes `plan.json` and the media file into `dir`.
async fn save_outputs(session: &Session, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let (Some(plan), Some(media)) = (session.plan(), session.media()) else {
        return Ok(Vec::new());
    };
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::new();
    let plan_path = dir.join("plan.json");
    tokio::fs::write(&plan_path, serde_json::to_string_pretty(plan)?).await?;
    written.push(plan_path);

    let media_path = dir.join(download_file_name(&plan.place, media.kind));
    if let Some(bytes) = media.inline_bytes() {
        tokio::fs::write(&media_path, bytes).await?;
        written.push(media_path);
    } else if let Some(local) = media.url.strip_prefix("file://") {
        tokio::fs::copy(local, &media_path).await?;
        written.push(media_path);
    } else if media.kind == MediaType::Image {
        tracing::warn!(url = %media.url, "poster is a placeholder, not saved");
    }
    Ok(written)
}

fn list_formats(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct FormatInfo {
        name: &'static str,
        media_type: MediaType,
    }

    let formats: Vec<FormatInfo> = CONTENT_FORMATS
        .iter()
        .map(|&name| FormatInfo {
            name,
            media_type: MediaType::for_content_type(name),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&formats)?);
    } else {
        println!("Content formats:\n");
        for (i, f) in formats.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, f.name, f.media_type);
        }
    }
    Ok(())
}
