//! Check the export toolchain and configuration.

use clipforge_common::{config_file_path, AppConfig};
use clipforge_render_engine::{FfmpegTranscoder, Transcoder, FFMPEG_ENV};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ClipForge System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    println!("[OK] Projects directory: {}", config.projects_dir.display());

    let ffmpeg_ok = match FfmpegTranscoder::locate(&config.export) {
        Ok(ffmpeg) => {
            println!("[OK] ffmpeg: {}", ffmpeg.binary().display());
            match ffmpeg.version().await {
                Ok(banner) => {
                    println!("     {banner}");
                    true
                }
                Err(e) => {
                    println!("[FAIL] ffmpeg -version: {e}");
                    false
                }
            }
        }
        Err(e) => {
            println!("[FAIL] {e}");
            println!("       Install ffmpeg, set {FFMPEG_ENV}, or set export.ffmpeg_path in the config");
            false
        }
    };

    let scratch = config.export.scratch_dir();
    let marker = scratch.join(format!(".{}-check-{}", config.export.artifact_prefix, std::process::id()));
    let scratch_ok = std::fs::create_dir_all(&scratch)
        .and_then(|_| std::fs::write(&marker, b""))
        .and_then(|_| std::fs::remove_file(&marker));
    let scratch_ok = match scratch_ok {
        Ok(()) => {
            println!("[OK] Scratch directory: {}", scratch.display());
            true
        }
        Err(e) => {
            println!("[FAIL] Scratch directory {} is not writable: {e}", scratch.display());
            false
        }
    };

    let encoder = &config.export.encoder;
    let settings_ok = match config.export.validate() {
        Ok(()) => {
            println!(
                "[OK] Encoder: {} (preset {}, crf {}), audio {}",
                encoder.video_codec, encoder.preset, encoder.crf, encoder.audio_codec
            );
            true
        }
        Err(e) => {
            println!("[FAIL] {e}");
            false
        }
    };

    println!();
    if ffmpeg_ok && scratch_ok && settings_ok {
        println!("ClipForge is ready to export.");
    } else {
        println!("Some requirements are missing. See above for fixes.");
    }

    Ok(())
}
