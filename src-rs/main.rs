use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use partmark::store::DEFAULT_QUOTA_BYTES;
use partmark::{
    capture, decode_data_uri, deliver, upload_artifact, CaptureOptions, CaptureRequest,
    CaptureSubject, CapturedArtifact, Delivery, DisplayPoint, HandoffStore, InteractionState,
    NaturalPoint, NaturalSize, PreciseSurface, RenderBox, Selection, SelectionMethod,
    SessionStore, SourceImage, TapOutcome, TapSurface, TouchSurface,
};

const SCRIPT_HELP: &str = r##"Replay script schema (JSON array of steps):
[
  {"op": "pointer_down", "x": 100, "y": 100},
  {"op": "pointer_move", "x": 130, "y": 100},
  {"op": "pointer_up"},
  {"op": "tap", "x": 110, "y": 50},
  {"op": "pan", "dx": 40, "dy": -20},
  {"op": "zoom_in"},
  {"op": "zoom_out"},
  {"op": "upload", "file": "my-photo.png"},
  {"op": "restart"},
  {"op": "cancel"},
  {"op": "confirm"},
  {"op": "reset"}
]

Notes:
- pointer_down/pointer_move/pointer_up drive the precise surface.
- tap drives the tap and touch surfaces; pan/zoom_in/zoom_out are touch-only.
- upload attaches a user photo on the tap surface; confirm then skips the marker.
- confirm runs the capture pipeline and delivers through the session store.
- coordinates are display-space pixels within the --display box.
"##;

#[derive(Parser, Debug)]
#[command(
    name = "partmark",
    version,
    about = "Part-selection and image-capture pipeline: mark a product photo, encode the result, hand it off"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Bake a circle or point marker into a photo and emit the artifact + metadata sidecar
    Mark(MarkArgs),
    /// Wrap a user-supplied photo as the artifact (no marker pass)
    Upload(UploadArgs),
    /// Replay a JSON gesture script against a surface and deliver through a session store
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct MarkArgs {
    /// Source photo path
    input: PathBuf,
    /// Circle selection as CX,CY,R in natural pixels
    #[arg(long, conflicts_with = "point")]
    circle: Option<String>,
    /// Point selection as X,Y in natural pixels
    #[arg(long)]
    point: Option<String>,
    /// Product name recorded in metadata
    #[arg(long)]
    product: Option<String>,
    /// Output image path (default: generated under the out dir)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Custom metadata sidecar path (default: <out>.json)
    #[arg(long)]
    sidecar: Option<PathBuf>,
    /// Disable metadata sidecar generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_sidecar: bool,
    /// Treat the source as cross-origin: dimensions only, no pixel read-back
    #[arg(long, action = ArgAction::SetTrue)]
    assume_tainted: bool,
    /// Baseline JPEG quality
    #[arg(long)]
    quality: Option<u8>,
    /// Data-URI size ceiling in characters before the degrade re-encode
    #[arg(long)]
    ceiling: Option<usize>,
    /// Print the artifact payload JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// The user's own photo
    file: PathBuf,
    /// Product name recorded in metadata
    #[arg(long)]
    product: Option<String>,
    /// Output image path (default: generated under the out dir)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Custom metadata sidecar path (default: <out>.json)
    #[arg(long)]
    sidecar: Option<PathBuf>,
    /// Disable metadata sidecar generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_sidecar: bool,
    /// Print the artifact payload JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SurfaceKind {
    Precise,
    Tap,
    Touch,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Source photo path
    input: PathBuf,
    /// Gesture script JSON path (or - for stdin)
    #[arg(long)]
    script: String,
    /// Which surface interprets the gestures
    #[arg(long, value_enum, default_value = "precise")]
    surface: SurfaceKind,
    /// On-screen render box as WxH display pixels
    #[arg(long, default_value = "800x600")]
    display: String,
    /// Session store quota in bytes
    #[arg(long, default_value_t = DEFAULT_QUOTA_BYTES)]
    quota: usize,
    /// Product name recorded in metadata
    #[arg(long)]
    product: Option<String>,
    /// Treat the source as cross-origin: dimensions only, no pixel read-back
    #[arg(long, action = ArgAction::SetTrue)]
    assume_tainted: bool,
    /// Write the delivered artifact image here
    #[arg(long)]
    out: Option<PathBuf>,
    /// Print the replay summary JSON to stdout
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Print script schema and exit
    #[arg(long, action = ArgAction::SetTrue)]
    script_help: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Commands => print_commands(),
        Commands::Mark(args) => command_mark(args),
        Commands::Upload(args) => command_upload(args),
        Commands::Replay(args) => command_replay(args),
    }
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "mark",
            "description": "Bake a circle/point marker into a photo and emit artifact + metadata sidecar.",
            "runner": "rust"
        }),
        json!({
            "name": "upload",
            "description": "Wrap a user photo as the artifact verbatim, no marker pass.",
            "runner": "rust"
        }),
        json!({
            "name": "replay",
            "description": "Replay a gesture script against a surface and deliver through a session store.",
            "runner": "rust"
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn command_mark(args: MarkArgs) -> Result<()> {
    let (selection, method) = match (&args.circle, &args.point) {
        (Some(circle), None) => {
            let (cx, cy, r) = parse_triple(circle).context("invalid --circle, expected CX,CY,R")?;
            if r <= 0.0 {
                bail!("--circle radius must be positive, got {r}");
            }
            (
                Selection::circle(NaturalPoint::new(cx, cy), r),
                SelectionMethod::CircleDraw,
            )
        }
        (None, Some(point)) => {
            let (x, y) = parse_pair(point).context("invalid --point, expected X,Y")?;
            (
                Selection::point(NaturalPoint::new(x, y)),
                SelectionMethod::TapPoint,
            )
        }
        _ => bail!("exactly one of --circle or --point is required"),
    };

    let source = load_source(&args.input, args.assume_tainted)?;
    let opts = capture_options(args.quality, args.ceiling);
    let request = CaptureRequest {
        subject: CaptureSubject::Marked(selection),
        method,
        product_name: args.product.clone(),
        source_path: args.input.display().to_string(),
    };
    let artifact = capture(&source, &request, &opts)
        .with_context(|| format!("capture failed for {}", args.input.display()))?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path("mark", args.product.as_deref(), &artifact));
    emit_artifact(&artifact, &out, args.sidecar, args.no_sidecar, args.json)
}

fn command_upload(args: UploadArgs) -> Result<()> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read upload: {}", args.file.display()))?;
    let artifact = upload_artifact(&bytes, args.product.clone(), &args.file.display().to_string())
        .with_context(|| format!("upload rejected: {}", args.file.display()))?;

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path("upload", args.product.as_deref(), &artifact));
    emit_artifact(&artifact, &out, args.sidecar, args.no_sidecar, args.json)
}

fn command_replay(args: ReplayArgs) -> Result<()> {
    if args.script_help {
        println!("{SCRIPT_HELP}");
        return Ok(());
    }

    let steps = load_script(&args.script)?;
    let (box_w, box_h) =
        parse_display(&args.display).context("invalid --display, expected WxH")?;
    let source = load_source(&args.input, args.assume_tainted)?;
    let render_box = RenderBox::new(box_w, box_h);
    let natural = source.natural_size();
    let source_path = args.input.display().to_string();

    let mut surface = ReplaySurface::new(
        args.surface,
        render_box,
        natural,
        args.product.clone(),
        &source_path,
    );
    let mut store = HandoffStore::new(SessionStore::new(args.quota));
    let opts = CaptureOptions::default();
    let mut last_delivery: Option<&'static str> = None;
    let mut delivered: Option<CapturedArtifact> = None;

    for (index, step) in steps.iter().enumerate() {
        let request = surface
            .apply(step)
            .with_context(|| format!("script step {}: {step:?}", index + 1))?;
        if let Some(request) = request {
            let artifact = capture(&source, &request, &opts)
                .with_context(|| format!("script step {}: capture failed", index + 1))?;
            let outcome = deliver(artifact.clone(), &mut store, &opts)?;
            let completed = match outcome {
                Delivery::Stored => {
                    last_delivery = Some("stored");
                    artifact
                }
                Delivery::Direct(direct) => {
                    last_delivery = Some("direct");
                    direct
                }
            };
            surface.complete(completed.clone());
            delivered = Some(completed);
        }
    }

    if let (Some(out), Some(artifact)) = (&args.out, &delivered) {
        write_artifact_image(artifact, out)?;
    }

    let summary = replay_summary(&args, &surface, &store, last_delivery, delivered.as_ref());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} steps -> {} ({})",
            steps.len(),
            state_name(surface.state()),
            last_delivery.unwrap_or("no delivery"),
        );
    }
    Ok(())
}

fn replay_summary(
    args: &ReplayArgs,
    surface: &ReplaySurface,
    store: &HandoffStore,
    last_delivery: Option<&'static str>,
    delivered: Option<&CapturedArtifact>,
) -> Value {
    let mut summary = json!({
        "surface": format!("{:?}", args.surface).to_lowercase(),
        "state": state_name(surface.state()),
        "delivery": last_delivery,
        "store": {
            "used_bytes": store.session().used_bytes(),
            "quota_bytes": store.session().quota_bytes(),
            "pending": store.is_pending(),
        },
    });
    if let Some(artifact) = delivered {
        summary["encoded_chars"] = json!(artifact.encoded_image.len());
        summary["metadata"] = serde_json::to_value(&artifact.metadata).unwrap_or(Value::Null);
    }
    if let Some(reason) = surface.failure() {
        summary["failure"] = json!(reason);
    }
    if let ReplaySurface::Touch(touch) = surface {
        let view = touch.view();
        summary["view"] = json!({
            "zoom": round_to(view.zoom, 3),
            "panX": round_to(view.pan_x, 3),
            "panY": round_to(view.pan_y, 3),
        });
    }
    summary
}

/// One step of a replay script. Tagged on `op`, coordinates in display
/// pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    Tap { x: f64, y: f64 },
    Pan { dx: f64, dy: f64 },
    ZoomIn,
    ZoomOut,
    Upload { file: PathBuf },
    Restart,
    Cancel,
    Confirm,
    Reset,
}

/// The three surfaces behind one dispatch seam, so the script loop stays
/// surface-agnostic.
#[derive(Debug)]
enum ReplaySurface {
    Precise(PreciseSurface),
    Tap(TapSurface),
    Touch(TouchSurface),
}

impl ReplaySurface {
    fn new(
        kind: SurfaceKind,
        render_box: RenderBox,
        natural: NaturalSize,
        product_name: Option<String>,
        source_path: &str,
    ) -> Self {
        match kind {
            SurfaceKind::Precise => Self::Precise(PreciseSurface::new(
                render_box,
                natural,
                product_name,
                source_path,
            )),
            SurfaceKind::Tap => Self::Tap(TapSurface::new(
                render_box,
                natural,
                product_name,
                source_path,
            )),
            SurfaceKind::Touch => Self::Touch(TouchSurface::new(
                render_box,
                natural,
                product_name,
                source_path,
            )),
        }
    }

    /// Apply one script step. `Confirm` hands back the capture request for
    /// the caller to run; every other step resolves in place.
    fn apply(&mut self, step: &Step) -> Result<Option<CaptureRequest>> {
        match (self, step) {
            (Self::Precise(s), Step::PointerDown { x, y }) => {
                s.pointer_down(DisplayPoint::new(*x, *y));
            }
            (Self::Precise(s), Step::PointerMove { x, y }) => {
                s.pointer_move(DisplayPoint::new(*x, *y));
            }
            (Self::Precise(s), Step::PointerUp) => {
                s.pointer_up();
            }
            (Self::Precise(s), Step::Restart) => {
                s.restart();
            }
            (Self::Tap(s), Step::Tap { x, y }) => {
                s.tap(DisplayPoint::new(*x, *y));
            }
            (Self::Tap(s), Step::Upload { file }) => {
                let bytes = fs::read(file)
                    .with_context(|| format!("failed to read upload: {}", file.display()))?;
                let name = file.display().to_string();
                s.attach_upload(name, bytes);
            }
            (Self::Touch(s), Step::Tap { x, y }) => {
                let _: TapOutcome = s.tap(DisplayPoint::new(*x, *y));
            }
            (Self::Touch(s), Step::Pan { dx, dy }) => s.pan_by(*dx, *dy),
            (Self::Touch(s), Step::ZoomIn) => s.zoom_in(),
            (Self::Touch(s), Step::ZoomOut) => s.zoom_out(),
            (surface, Step::Cancel) => {
                surface.cancel();
            }
            (surface, Step::Reset) => {
                surface.reset();
            }
            (surface, Step::Confirm) => {
                let Some(request) = surface.confirm() else {
                    bail!("nothing to confirm");
                };
                return Ok(Some(request));
            }
            (surface, step) => bail!(
                "{step:?} is not supported by the {} surface",
                surface.kind_name()
            ),
        }
        Ok(None)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Precise(_) => "precise",
            Self::Tap(_) => "tap",
            Self::Touch(_) => "touch",
        }
    }

    fn confirm(&mut self) -> Option<CaptureRequest> {
        match self {
            Self::Precise(s) => s.confirm(),
            Self::Tap(s) => s.confirm(),
            Self::Touch(s) => s.confirm(),
        }
    }

    fn complete(&mut self, artifact: CapturedArtifact) {
        match self {
            Self::Precise(s) => s.complete(Ok(artifact)),
            Self::Tap(s) => s.complete(Ok(artifact)),
            Self::Touch(s) => s.complete(Ok(artifact)),
        };
    }

    fn cancel(&mut self) -> bool {
        match self {
            Self::Precise(s) => s.cancel(),
            Self::Tap(s) => s.cancel(),
            Self::Touch(s) => s.cancel(),
        }
    }

    fn reset(&mut self) -> bool {
        match self {
            Self::Precise(s) => s.reset(),
            Self::Tap(s) => s.reset(),
            Self::Touch(s) => s.reset(),
        }
    }

    fn state(&self) -> &InteractionState {
        match self {
            Self::Precise(s) => s.state(),
            Self::Tap(s) => s.state(),
            Self::Touch(s) => s.state(),
        }
    }

    fn failure(&self) -> Option<&str> {
        match self {
            Self::Precise(s) => s.failure(),
            Self::Tap(s) => s.failure(),
            Self::Touch(s) => s.failure(),
        }
    }
}

fn load_source(path: &Path, assume_tainted: bool) -> Result<SourceImage> {
    let source = SourceImage::from_path(path)
        .with_context(|| format!("failed to load source image: {}", path.display()))?;
    Ok(if assume_tainted {
        source.with_taint()
    } else {
        source
    })
}

fn load_script(path: &str) -> Result<Vec<Step>> {
    let raw = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read script from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read script: {path}"))?
    };
    let steps: Vec<Step> =
        serde_json::from_str(&raw).with_context(|| format!("invalid script JSON: {path}"))?;
    if steps.is_empty() {
        bail!("script has no steps");
    }
    Ok(steps)
}

fn capture_options(quality: Option<u8>, ceiling: Option<usize>) -> CaptureOptions {
    let mut opts = CaptureOptions::default();
    if let Some(quality) = quality {
        opts.jpeg_quality = quality;
    }
    if let Some(ceiling) = ceiling {
        opts.size_ceiling = ceiling;
    }
    opts
}

fn emit_artifact(
    artifact: &CapturedArtifact,
    out: &Path,
    sidecar: Option<PathBuf>,
    no_sidecar: bool,
    as_json: bool,
) -> Result<()> {
    write_artifact_image(artifact, out)?;

    let payload = json!({
        "image_path": out.display().to_string(),
        "encoded_chars": artifact.encoded_image.len(),
        "metadata": serde_json::to_value(&artifact.metadata)?,
    });

    if !no_sidecar {
        let sidecar_path = sidecar.unwrap_or_else(|| default_sidecar_for(out));
        write_json_pretty(&sidecar_path, &payload)?;
    }

    if as_json {
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        println!("{}", out.display());
    }
    Ok(())
}

fn write_artifact_image(artifact: &CapturedArtifact, out: &Path) -> Result<()> {
    let (_, bytes) = decode_data_uri(&artifact.encoded_image)?;
    ensure_parent_dir(out)?;
    fs::write(out, bytes).with_context(|| format!("failed to write image: {}", out.display()))?;
    Ok(())
}

fn default_output_path(
    command: &str,
    product: Option<&str>,
    artifact: &CapturedArtifact,
) -> PathBuf {
    let slug = slugify(product.unwrap_or("part"));
    let ts = timestamp_compact();
    let rand = rand::thread_rng().gen_range(1000..9999);
    let ext = extension_for(&artifact.encoded_image);
    out_root().join(command).join(format!(
        "part-{slug}-{ts}-{}-{rand}.{ext}",
        std::process::id()
    ))
}

fn extension_for(encoded: &str) -> &'static str {
    match decode_data_uri(encoded).map(|(mime, _)| mime) {
        Ok(mime) if mime == "image/png" => "png",
        Ok(mime) if mime == "image/gif" => "gif",
        _ => "jpg",
    }
}

fn out_root() -> PathBuf {
    env::var("PARTMARK_OUT_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".partmark"))
}

fn default_sidecar_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.json"))
}

fn write_json_pretty(path: &Path, value: &Value) -> Result<()> {
    ensure_parent_dir(path)?;
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("failed to write JSON: {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || matches!(lower, '.' | '_' | '-') {
            out.push(lower);
        } else if lower.is_ascii_whitespace() {
            out.push('-');
        }
    }
    if out.is_empty() {
        "part".to_string()
    } else {
        out
    }
}

fn timestamp_compact() -> String {
    Utc::now().format("%Y%m%d-%H%M%S").to_string()
}

fn round_to(v: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (v * factor).round() / factor
}

fn parse_pair(input: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        bail!("expected two comma-separated numbers, got {input:?}");
    }
    Ok((parse_number(parts[0])?, parse_number(parts[1])?))
}

fn parse_triple(input: &str) -> Result<(f64, f64, f64)> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("expected three comma-separated numbers, got {input:?}");
    }
    Ok((
        parse_number(parts[0])?,
        parse_number(parts[1])?,
        parse_number(parts[2])?,
    ))
}

fn parse_number(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("not a number: {raw:?}"))?;
    if !value.is_finite() {
        bail!("not a finite number: {raw:?}");
    }
    Ok(value)
}

fn parse_display(input: &str) -> Result<(f64, f64)> {
    let Some((w, h)) = input.split_once('x') else {
        bail!("expected WxH, got {input:?}");
    };
    let w = parse_number(w.trim())?;
    let h = parse_number(h.trim())?;
    if w <= 0.0 || h <= 0.0 {
        bail!("display box must be positive, got {input:?}");
    }
    Ok((w, h))
}

fn state_name(state: &InteractionState) -> &'static str {
    match state {
        InteractionState::Idle => "idle",
        InteractionState::Drawing(_) => "drawing",
        InteractionState::Selected(_) => "selected",
        InteractionState::Processing => "processing",
        InteractionState::Completed(_) => "completed",
        InteractionState::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_photo(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 120, 255])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn pair_and_triple_parsing() {
        assert_eq!(parse_pair("100, 100").unwrap(), (100.0, 100.0));
        assert_eq!(parse_triple("200,180,45.5").unwrap(), (200.0, 180.0, 45.5));
        assert!(parse_pair("100").is_err());
        assert!(parse_triple("1,2").is_err());
        assert!(parse_pair("1,NaN").is_err());
    }

    #[test]
    fn display_parsing_rejects_degenerate_boxes() {
        assert_eq!(parse_display("500x500").unwrap(), (500.0, 500.0));
        assert!(parse_display("500").is_err());
        assert!(parse_display("0x300").is_err());
    }

    #[test]
    fn slugify_flattens_product_names() {
        assert_eq!(slugify("Meridian Desk Lamp"), "meridian-desk-lamp");
        assert_eq!(slugify("!!!"), "part");
    }

    #[test]
    fn writes_json_pretty() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a").join("b.json");
        write_json_pretty(&target, &json!({"ok": true})).unwrap();
        assert!(target.exists());
    }

    #[test]
    fn script_steps_deserialize_from_tagged_json() {
        let raw = r#"[
            {"op": "pointer_down", "x": 100, "y": 100},
            {"op": "pointer_move", "x": 130, "y": 100},
            {"op": "pointer_up"},
            {"op": "confirm"}
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(raw).unwrap();
        assert_eq!(steps.len(), 4);
        assert!(matches!(steps[0], Step::PointerDown { x, .. } if x == 100.0));
        assert!(matches!(steps[3], Step::Confirm));
    }

    #[test]
    fn mark_writes_image_and_sidecar() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lamp.png");
        write_photo(&input, 200, 150);
        let out = dir.path().join("marked.jpg");

        command_mark(MarkArgs {
            input,
            circle: Some("100,75,30".into()),
            point: None,
            product: Some("Meridian Desk Lamp".into()),
            out: Some(out.clone()),
            sidecar: None,
            no_sidecar: false,
            assume_tainted: false,
            quality: None,
            ceiling: None,
            json: false,
        })
        .unwrap();

        assert!(out.exists());
        let sidecar = fs::read_to_string(dir.path().join("marked.json")).unwrap();
        let payload: Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(
            payload["metadata"]["selectionMethod"],
            json!("circle-draw")
        );
        assert_eq!(payload["metadata"]["isFallbackRender"], json!(false));
    }

    #[test]
    fn tainted_mark_records_the_fallback_render() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lamp.png");
        write_photo(&input, 200, 150);
        let out = dir.path().join("marked.jpg");

        command_mark(MarkArgs {
            input,
            circle: None,
            point: Some("100,75".into()),
            product: None,
            out: Some(out.clone()),
            sidecar: None,
            no_sidecar: false,
            assume_tainted: true,
            quality: None,
            ceiling: None,
            json: false,
        })
        .unwrap();

        let sidecar = fs::read_to_string(dir.path().join("marked.json")).unwrap();
        let payload: Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(payload["metadata"]["isFallbackRender"], json!(true));
    }

    #[test]
    fn upload_round_trips_the_file_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("mine.png");
        write_photo(&input, 60, 40);
        let out = dir.path().join("handoff.png");

        command_upload(UploadArgs {
            file: input.clone(),
            product: None,
            out: Some(out.clone()),
            sidecar: None,
            no_sidecar: true,
            json: false,
        })
        .unwrap();

        assert_eq!(fs::read(&out).unwrap(), fs::read(&input).unwrap());
    }

    #[test]
    fn replay_drives_a_precise_drag_to_delivery() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lamp.png");
        write_photo(&input, 1000, 1000);
        let script = dir.path().join("drag.json");
        fs::write(
            &script,
            r#"[
                {"op": "pointer_down", "x": 100, "y": 100},
                {"op": "pointer_move", "x": 130, "y": 100},
                {"op": "pointer_up"},
                {"op": "confirm"}
            ]"#,
        )
        .unwrap();
        let out = dir.path().join("delivered.jpg");

        command_replay(ReplayArgs {
            input,
            script: script.display().to_string(),
            surface: SurfaceKind::Precise,
            display: "500x500".into(),
            quota: DEFAULT_QUOTA_BYTES,
            product: None,
            assume_tainted: false,
            out: Some(out.clone()),
            json: false,
            script_help: false,
        })
        .unwrap();

        assert!(out.exists());
    }

    #[test]
    fn replay_rejects_steps_foreign_to_the_surface() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("lamp.png");
        write_photo(&input, 100, 100);
        let script = dir.path().join("bad.json");
        fs::write(&script, r#"[{"op": "zoom_in"}]"#).unwrap();

        let err = command_replay(ReplayArgs {
            input,
            script: script.display().to_string(),
            surface: SurfaceKind::Precise,
            display: "500x500".into(),
            quota: DEFAULT_QUOTA_BYTES,
            product: None,
            assume_tainted: false,
            out: None,
            json: false,
            script_help: false,
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("not supported"));
    }
}
