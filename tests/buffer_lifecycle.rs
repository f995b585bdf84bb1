use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use rust_perceptron::{Dataset, Perceptron, Topology};

struct CountingAlloc {
    allocs: AtomicUsize,
    deallocs: AtomicUsize,
    live: AtomicIsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            deallocs: AtomicUsize::new(0),
            live: AtomicIsize::new(0),
        }
    }

    fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocs: self.allocs.load(Ordering::SeqCst),
            deallocs: self.deallocs.load(Ordering::SeqCst),
            live: self.live.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocSnapshot {
    allocs: usize,
    deallocs: usize,
    live: isize,
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(layout.size() as isize, Ordering::SeqCst);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(layout.size() as isize, Ordering::SeqCst);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocs.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(layout.size() as isize, Ordering::SeqCst);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.live
            .fetch_add(new_size as isize - layout.size() as isize, Ordering::SeqCst);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

fn batch(len: usize) -> Dataset {
    let inputs = (0..len * 4).map(|i| (i % 7) as f64 / 7.0).collect();
    let targets = (0..len * 2).map(|i| (i % 3) as f64 - 1.0).collect();
    Dataset::from_flat(inputs, targets, 4, 2).unwrap()
}

fn parallel_cycle(net: &mut Perceptron, data: &Dataset) {
    net.enable_parallel_training(3).unwrap();
    assert_eq!(net.worker_count(), 3);
    net.train(data).unwrap();
    net.disable_parallel_training();
    assert_eq!(net.worker_count(), 0);
}

// A single test: the allocator is process-wide, so concurrent tests would skew it.
#[test]
fn worker_buffers_are_released_on_disable_and_drop() {
    let data = batch(24);

    // Warm up lazily initialized runtime state (thread bookkeeping, log callsites).
    {
        let mut warm = Perceptron::new(Topology::new(4, 2, 6, 2));
        warm.train(&data).unwrap();
        parallel_cycle(&mut warm, &data);
    }

    let empty = ALLOC.snapshot();
    let mut net = Perceptron::new(Topology::new(4, 2, 6, 2));
    net.train(&data).unwrap();
    let serial = ALLOC.snapshot();

    parallel_cycle(&mut net, &data);
    let after_first = ALLOC.snapshot();
    assert_eq!(
        serial.live, after_first.live,
        "enable/disable leaked memory: before={serial:?} after={after_first:?}"
    );
    assert!(after_first.allocs > serial.allocs);

    parallel_cycle(&mut net, &data);
    let after_second = ALLOC.snapshot();
    assert_eq!(
        serial.live, after_second.live,
        "second enable/disable leaked memory: before={serial:?} after={after_second:?}"
    );

    // Dropping with a live pool joins the workers and frees everything.
    net.enable_parallel_training(2).unwrap();
    drop(net);
    let dropped = ALLOC.snapshot();
    assert_eq!(
        empty.live, dropped.live,
        "drop leaked memory: before={empty:?} after={dropped:?}"
    );
    assert!(dropped.deallocs > empty.deallocs);
}
