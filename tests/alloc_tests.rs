use spike_trace::metric::alloc::{is_installed, live_bytes, untracked};
use spike_trace::metric::CountingAllocator;
use spike_trace::{MetricRegistry, Tracer, TracerConfig};
use std::alloc::{GlobalAlloc, Layout};
use std::sync::{Mutex, MutexGuard};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

// The byte counters are process-wide; keep these tests from overlapping
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

fn memory_tracer() -> Tracer {
    let registry = MetricRegistry::with_builtins().unwrap();
    Tracer::from_registry(TracerConfig::new().with_enabled(true), &registry)
}

#[test]
fn test_builtins_include_memory_when_installed() {
    let _serial = serial();
    assert!(is_installed());

    let registry = MetricRegistry::with_builtins().unwrap();
    let names: Vec<&str> = registry.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Memory Allocated", "Latency"]);
}

#[test]
fn test_memory_metric_sees_live_allocation() {
    let _serial = serial();

    let before = live_bytes();
    let buffer = vec![0u8; 4 << 20];
    assert!(live_bytes() - before >= buffer.len() as i64 / 2);
    drop(buffer);
}

#[test]
fn test_untracked_allocations_are_not_counted() {
    let _serial = serial();

    let before = live_bytes();
    let buffer = untracked(|| vec![0u8; 4 << 20]);
    assert!(live_bytes() - before < (1 << 20));
    untracked(|| drop(buffer));
}

#[test]
fn test_memory_section_reports_allocating_scope() {
    let _serial = serial();
    let tracer = memory_tracer();

    let kept = tracer.in_scope("allocate", || vec![1u8; 8 << 20]);

    let summary = tracer.summary();
    assert!(summary.contains("  Top 10 Memory Allocated Spikes:\n"));
    assert!(summary.contains("]  allocate"));
    assert!(summary.contains(" MB"));
    drop(kept);
}

#[test]
fn test_tracer_bookkeeping_is_not_charged_to_scopes() {
    let _serial = serial();
    let tracer = memory_tracer();

    let outer = tracer.trace("outer_allocates_nothing");
    let outer_id = outer.span_ids()[0];
    for _ in 0..20_000 {
        let _child = tracer.trace("empty_child");
    }
    drop(outer);

    let recorder = tracer.recorder("Memory Allocated").unwrap();
    let store = recorder.lock();
    assert_eq!(store.len(), 20_001);

    // Twenty thousand spans of bookkeeping would be megabytes
    let delta_mb = store.node(outer_id).delta();
    assert!(delta_mb.abs() < 0.05, "outer scope charged {} MB", delta_mb);
}

#[test]
fn test_failed_allocations_are_not_counted() {
    let _serial = serial();
    let huge = isize::MAX as usize / 2;

    let before = live_bytes();
    let ptr = unsafe { ALLOC.alloc(Layout::from_size_align(huge, 8).unwrap()) };
    assert!(ptr.is_null());
    assert!(live_bytes() - before < (1 << 20));

    let layout = Layout::from_size_align(64, 8).unwrap();
    unsafe {
        let block = ALLOC.alloc(layout);
        assert!(!block.is_null());

        let before = live_bytes();
        assert!(ALLOC.realloc(block, layout, huge).is_null());
        assert!((live_bytes() - before).abs() < (1 << 20));

        ALLOC.dealloc(block, layout);
    }
}
