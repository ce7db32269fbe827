use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use capsim::{
    Config, FlatSynthesizer, FrameLayout, HardwareSimulation, HardwareSink, Mapping, MappingOwner,
    PixelFormat, Registers, State,
};

const INTERVAL: Duration = Duration::from_millis(5);

#[derive(Default)]
struct TickLog {
    interrupts: AtomicU32,
    last_tick: AtomicU32,
}

impl HardwareSink for TickLog {
    fn on_interrupt(&self, registers: &Registers<'_>) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        self.last_tick.store(registers.tick_count(), Ordering::SeqCst);
    }
}

fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn running(width: u32, height: u32) -> (HardwareSimulation, Arc<TickLog>) {
    let log = Arc::new(TickLog::default());
    let hw = HardwareSimulation::with_config(
        Config {
            quiesce_poll_ms: 10,
            ..Config::default()
        },
        log.clone(),
    )
    .unwrap();
    let synth = Box::new(FlatSynthesizer::black(PixelFormat::Rgb24));
    let image_size = (width * height * 3) as usize;
    hw.start(synth, INTERVAL, width, height, image_size).unwrap();
    (hw, log)
}

#[test]
fn ticks_stop_after_stop_returns() {
    let (hw, log) = running(4, 2);
    assert!(wait_until(|| log.interrupts.load(Ordering::SeqCst) >= 3));

    hw.stop().unwrap();
    assert_eq!(hw.state(), State::Stopped);
    assert!(!hw.has_buffers());

    let seen = log.interrupts.load(Ordering::SeqCst);
    thread::sleep(INTERVAL * 10);
    assert_eq!(log.interrupts.load(Ordering::SeqCst), seen);
}

#[test]
fn every_tick_skips_without_mappings() {
    let (hw, log) = running(4, 2);
    assert!(wait_until(|| log.interrupts.load(Ordering::SeqCst) >= 3));
    hw.stop().unwrap();

    // the acknowledging tick also ran while running
    assert_eq!(hw.skipped_frame_count(), log.interrupts.load(Ordering::SeqCst));
    assert_eq!(hw.tick_count(), log.last_tick.load(Ordering::SeqCst));
}

#[test]
fn frames_land_in_programming_order() {
    let (hw, _log) = running(2, 2);
    hw.set_data(&[1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);

    let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::default());
    let mut buf = vec![0xaau8; 12 * 3];
    let mut ptr = buf.as_mut_ptr();
    let inserted = unsafe {
        hw.program_scatter_gather_mappings(&owner, &mut ptr, &[Mapping::new(12); 3])
    };
    assert_eq!(inserted, 3);

    assert!(wait_until(|| hw.read_number_of_mappings_completed() == 3));
    assert_eq!(hw.mappings_queued(), 0);
    hw.stop().unwrap();

    // every frame is fully placed, bottom row first
    for frame in buf.chunks_exact(12) {
        assert_eq!(frame, [3, 3, 3, 4, 4, 4, 1, 1, 1, 2, 2, 2]);
    }
}

#[test]
fn pause_holds_frames_until_resumed() {
    let (hw, log) = running(2, 1);
    hw.pause(true).unwrap();
    assert_eq!(hw.state(), State::Paused);

    let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::default());
    let mut buf = vec![0u8; 6];
    let mut ptr = buf.as_mut_ptr();
    unsafe { hw.program_scatter_gather_mappings(&owner, &mut ptr, &[Mapping::new(6)]) };

    let interrupts = log.interrupts.load(Ordering::SeqCst);
    thread::sleep(INTERVAL * 10);
    assert_eq!(log.interrupts.load(Ordering::SeqCst), interrupts);
    assert_eq!(hw.mappings_queued(), 1);

    hw.pause(false).unwrap();
    assert_eq!(hw.state(), State::Running);
    assert!(wait_until(|| hw.read_number_of_mappings_completed() == 1));
    hw.stop().unwrap();
}

#[test]
fn drop_stops_the_hardware() {
    let (hw, log) = running(4, 2);
    assert!(wait_until(|| log.interrupts.load(Ordering::SeqCst) >= 1));
    drop(hw);

    let seen = log.interrupts.load(Ordering::SeqCst);
    thread::sleep(INTERVAL * 10);
    assert_eq!(log.interrupts.load(Ordering::SeqCst), seen);
}
