use std::collections::VecDeque;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use capsim::format::FourCC;
use capsim::prelude::*;
use tracing_subscriber::EnvFilter;

/// Forwards completion counts to the capture loop
struct Completions {
    tx: Mutex<Sender<u32>>,
}

impl CaptureSink for Completions {
    fn complete_mappings(&self, count: u32) {
        if count > 0 {
            if let Ok(tx) = self.tx.lock() {
                let _ = tx.send(count);
            }
        }
    }
}

/// Top-down RGB24 test frame with a bar moving one column per frame
fn test_frame(width: usize, height: usize, n: usize) -> Vec<u8> {
    let mut frame = vec![0u8; width * height * 3];
    for (y, row) in frame.chunks_exact_mut(width * 3).enumerate() {
        for (x, px) in row.chunks_exact_mut(3).enumerate() {
            let lit = x == n % width;
            px[0] = if lit { 0xff } else { (x * 255 / width) as u8 };
            px[1] = (y * 255 / height) as u8;
            px[2] = if lit { 0xff } else { 0x40 };
        }
    }
    frame
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Capture 30 frames by default
    let count = 30;

    // Keep 4 frames in flight
    let buffer_count = 4;

    let info = VideoInfo::packed(FourCC::RGB3, 320, -240, Fraction::per_second(30));
    println!("Stream:\n{}", info);

    let (tx, rx) = mpsc::channel();
    let dev = CaptureDevice::new()?;
    dev.acquire_hardware_resources(Arc::new(Completions { tx: Mutex::new(tx) }), info)?;

    let image_size = info.image_size as usize;
    let mut buffers = vec![vec![0u8; image_size]; buffer_count];
    let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::default());
    let mapping = [Mapping::new(info.image_size)];

    dev.start()?;

    let mut in_flight = VecDeque::new();
    for (index, buf) in buffers.iter_mut().enumerate() {
        let mut ptr = buf.as_mut_ptr();
        // SAFETY: the buffers outlive the stream, which is stopped before they are dropped
        if unsafe { dev.program_scatter_gather_mappings(&owner, &mut ptr, &mapping) } == 1 {
            in_flight.push_back(index);
        }
    }
    if in_flight.is_empty() {
        bail!("hardware accepted no buffers");
    }

    let start = Instant::now();
    let mut captured = 0;
    while captured < count {
        dev.set_data(&test_frame(320, 240, captured));

        let completed = rx
            .recv_timeout(Duration::from_secs(2))
            .context("no frame completed within two seconds")?;
        for _ in 0..completed {
            let index = match in_flight.pop_front() {
                Some(index) => index,
                None => break,
            };
            captured += 1;

            let buf = &mut buffers[index];
            println!("Frame {:>3}  buffer {}  first pixel {:?}", captured, index, &buf[..3]);

            let mut ptr = buf.as_mut_ptr();
            // SAFETY: as above
            if unsafe { dev.program_scatter_gather_mappings(&owner, &mut ptr, &mapping) } == 1 {
                in_flight.push_back(index);
            }
        }
    }

    dev.stop()?;
    dev.release_hardware_resources();

    println!();
    println!("FPS: {}", captured as f64 / start.elapsed().as_secs_f64());
    println!("Interrupts: {}", dev.query_interrupt_time());
    println!("Skipped frames: {}", dev.skipped_frame_count());

    Ok(())
}
