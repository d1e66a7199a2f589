use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    music_dir: Option<PathBuf>,
    no_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    // Must run before any thread exists.
    let clock_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);

    if let Err(err) = grinch::logging::init() {
        eprintln!("logging disabled: {err:#}");
    }

    let mut settings = grinch::config::load_settings()?;
    if let Some(dir) = args.music_dir {
        settings.music_dir = dir;
    }
    log::info!(
        "grinch starting, music directory {}",
        settings.music_dir.display()
    );

    grinch::app::run(grinch::app::AppOptions {
        settings,
        no_audio: args.no_audio,
        clock_offset,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--no-audio" => out.no_audio = true,
            "--music-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--music-dir requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--music-dir cannot be empty");
                }
                out.music_dir = Some(PathBuf::from(value.trim()));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("Grinch");
    println!("  --music-dir <path>  Folder to list tracks from (default: Music)");
    println!("  --no-audio          Run without an audio output device");
    println!();
    println!("Keys: space play/pause, n/p next/previous, enter play selected,");
    println!("      f fullscreen, m minimize, q quit");
}
