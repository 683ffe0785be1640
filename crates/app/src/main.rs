//! Entry point for Orrery: logging + command-line flags.

use std::path::PathBuf;

use anyhow::Result;
use platform::RunOptions;

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{other}', falling back to auto.");
            wgpu::Backends::all()
        }
    }
}

fn parse_switch(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Accepts `--key=value` flags; anything unknown is warned about and ignored.
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> RunOptions {
    let mut options = RunOptions::default();
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--gpu-backend=") {
            options.backends = parse_backend(v);
        } else if arg == "--show-fps" {
            options.show_fps = true;
        } else if let Some(v) = arg.strip_prefix("--show-fps=") {
            options.show_fps = parse_switch(v);
        } else if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            w = v.parse().ok().or(w);
        } else if let Some(v) = arg.strip_prefix("--height=") {
            h = v.parse().ok().or(h);
        } else if let Some(v) = arg.strip_prefix("--obj=") {
            options.obj_paths.push(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--texture=") {
            options.texture = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--sphere-bands=") {
            match v.parse::<u32>() {
                Ok(n) => options.sphere_bands = n,
                Err(_) => log::warn!("Ignoring --sphere-bands={v}: not a number"),
            }
        } else {
            log::warn!("Ignoring unknown argument '{arg}'");
        }
    }

    options.width = w.unwrap_or(options.width).max(1);
    options.height = h.unwrap_or(options.height).max(1);
    options
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args(std::env::args().skip(1));
    log::info!(
        "Starting Orrery. Backend: {:?}, show_fps={}, window_size={}x{}, models={}",
        options.backends,
        options.show_fps,
        options.width,
        options.height,
        options.obj_paths.len()
    );

    platform::run_with_renderer(options)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
