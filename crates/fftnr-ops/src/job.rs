//! Block jobs and the queues that carry them between threads.
//!
//! A session uses two [`JobQueue`]s: workers take from "waiting" and push
//! to "finished", the orchestrator drains "finished" and merges each block
//! into the output image.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fftnr_core::{BlockBuffer, PlaneView};
use parking_lot::{Condvar, Mutex};

use crate::fft::BlockTransform;
use crate::filter::{ComplexFilter, SpectralFilter};
use crate::freq::FrequencyBlock;
use crate::planar::PlanarImage;
use crate::tiling::BlockTile;
use crate::window::WindowSet;
use crate::OpsResult;

/// One block of one plane, with everything needed to filter it.
///
/// The input is a view into the shared source image, which stays read-only
/// for the whole run; the output block is owned.
pub struct Job {
    source: Arc<PlanarImage>,
    plane: usize,
    tile: BlockTile,
    filter: Arc<ComplexFilter>,
    window: Arc<WindowSet>,
    output: BlockBuffer,
    skipped: bool,
}

impl Job {
    /// Creates a job for `tile` of plane `plane`.
    ///
    /// # Panics
    ///
    /// Panics if the plane index or tile is outside `source`.
    pub fn new(
        source: Arc<PlanarImage>,
        plane: usize,
        tile: BlockTile,
        filter: Arc<ComplexFilter>,
        window: Arc<WindowSet>,
    ) -> Self {
        assert!(plane < source.plane_count(), "plane {plane} out of range");
        let (pw, ph) = source.padded_dimensions();
        assert!(
            tile.block_rect().fits_within(pw, ph),
            "tile {:?} outside {pw}x{ph} plane",
            tile.block_rect()
        );
        assert!(
            tile.block_rect().contains_rect(&tile.write_rect()),
            "tile writes outside its block"
        );
        Self {
            source,
            plane,
            tile,
            filter,
            window,
            output: BlockBuffer::new(tile.width, tile.height),
            skipped: false,
        }
    }

    /// Plane index.
    pub fn plane(&self) -> usize {
        self.plane
    }

    /// Block placement.
    pub fn tile(&self) -> &BlockTile {
        &self.tile
    }

    /// Filter for this plane.
    pub fn filter(&self) -> &ComplexFilter {
        &self.filter
    }

    /// Input samples of the block.
    pub fn input(&self) -> PlaneView<'_> {
        self.source.plane(self.plane).slice(self.tile.block_rect())
    }

    /// Filtered block, scaled by `width * height`. Unallocated until processed.
    pub fn output(&self) -> &BlockBuffer {
        &self.output
    }

    /// `true` when the block is passed through unfiltered.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Marks the block to be passed through unfiltered.
    pub fn mark_skipped(&mut self) {
        self.skipped = true;
    }

    /// Windows, transforms, filters and inverse-transforms the block.
    ///
    /// Skipped jobs are left untouched.
    pub fn run(&mut self, transform: &BlockTransform, block: &mut FrequencyBlock) -> OpsResult<()> {
        if self.skipped {
            return Ok(());
        }
        block.forward(transform, &self.input(), &self.window)?;
        self.filter.process(block);
        block.inverse(transform, &mut self.output)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("plane", &self.plane)
            .field("tile", &self.tile)
            .field("filter", &self.filter.name())
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// FIFO of jobs shared between threads.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    added: Condvar,
}

impl JobQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one job and wakes one waiter.
    pub fn add_job(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.added.notify_one();
    }

    /// Appends jobs under a single lock and wakes every waiter.
    pub fn add_jobs(&self, jobs: impl IntoIterator<Item = Job>) {
        self.jobs.lock().extend(jobs);
        self.added.notify_all();
    }

    /// Takes the oldest job without blocking.
    pub fn get_job(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    /// Takes `max(1, ceil(percent% of queued))` jobs, or none if empty.
    pub fn get_jobs_percent(&self, percent: usize) -> Vec<Job> {
        let mut jobs = self.jobs.lock();
        let count = batch_size(jobs.len(), percent);
        jobs.drain(..count).collect()
    }

    /// Takes the oldest job, blocking until one arrives.
    pub fn wait_for_job(&self) -> Job {
        let mut jobs = self.jobs.lock();
        loop {
            if let Some(job) = jobs.pop_front() {
                return job;
            }
            self.added.wait(&mut jobs);
        }
    }

    /// Takes the oldest job, blocking for at most `timeout`.
    ///
    /// Returns `None` only once the deadline has passed with the queue empty;
    /// wakeups that find nothing queued keep waiting.
    pub fn wait_for_job_timeout(&self, timeout: Duration) -> Option<Job> {
        let deadline = Instant::now() + timeout;
        let mut jobs = self.jobs.lock();
        loop {
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            if self.added.wait_until(&mut jobs, deadline).timed_out() {
                return jobs.pop_front();
            }
        }
    }

    /// Number of queued jobs.
    pub fn jobs_left(&self) -> usize {
        self.jobs.lock().len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Discards every queued job and returns how many there were.
    pub fn remove_remaining(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let count = jobs.len();
        jobs.clear();
        count
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("jobs_left", &self.jobs_left())
            .finish()
    }
}

fn batch_size(queued: usize, percent: usize) -> usize {
    if queued == 0 {
        return 0;
    }
    (queued * percent).div_ceil(100).clamp(1, queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::GridSample;
    use crate::params::{ColorMode, DenoiseParams};
    use crate::tiling::tile_plane;
    use crate::window::WindowKind;
    use fftnr_math::KernelSet;
    use std::thread;

    const B: usize = 16;
    const OV: usize = 4;

    fn jobs(count: usize) -> Vec<Job> {
        let image = Arc::new(PlanarImage::new(40, 40, OV, ColorMode::Rgb));
        let transform = BlockTransform::new(B, B).unwrap();
        let window = Arc::new(WindowSet::new(WindowKind::HalfCosine, B, B, OV).unwrap());
        let grid = Arc::new(GridSample::new(&transform, &window).unwrap());
        let settings = DenoiseParams::default().plane_settings(0);
        let filter = Arc::new(
            ComplexFilter::build(B, B, &settings, &grid, KernelSet::detect()).unwrap(),
        );
        let (pw, ph) = image.padded_dimensions();
        tile_plane(pw, ph, B, B, OV)
            .into_iter()
            .cycle()
            .take(count)
            .map(|t| Job::new(Arc::clone(&image), 0, t, Arc::clone(&filter), Arc::clone(&window)))
            .collect()
    }

    #[test]
    fn test_batch_size() {
        assert_eq!(batch_size(0, 10), 0);
        assert_eq!(batch_size(1, 10), 1);
        assert_eq!(batch_size(9, 10), 1);
        assert_eq!(batch_size(11, 10), 2);
        assert_eq!(batch_size(100, 10), 10);
        assert_eq!(batch_size(7, 100), 7);
    }

    #[test]
    fn test_get_jobs_percent_drains_in_batches() {
        let queue = JobQueue::new();
        queue.add_jobs(jobs(25));
        let mut left = queue.jobs_left();
        assert_eq!(left, 25);
        while left > 0 {
            let batch = queue.get_jobs_percent(10);
            assert!(!batch.is_empty() && batch.len() <= left);
            assert_eq!(queue.jobs_left(), left - batch.len());
            left = queue.jobs_left();
        }
        assert!(queue.get_jobs_percent(10).is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        let all = jobs(4);
        let tiles: Vec<_> = all.iter().map(|j| *j.tile()).collect();
        for job in all {
            queue.add_job(job);
        }
        for tile in tiles {
            assert_eq!(queue.get_job().map(|j| *j.tile()), Some(tile));
        }
        assert!(queue.get_job().is_none());
    }

    #[test]
    fn test_remove_remaining_counts() {
        let queue = JobQueue::new();
        queue.add_jobs(jobs(6));
        queue.get_job();
        assert_eq!(queue.remove_remaining(), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.remove_remaining(), 0);
    }

    #[test]
    fn test_wait_for_job_wakes() {
        let queue = Arc::new(JobQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_for_job().plane())
        };
        thread::sleep(Duration::from_millis(20));
        queue.add_jobs(jobs(1));
        assert_eq!(waiter.join().unwrap(), 0);
        assert!(queue.wait_for_job_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_wait_timeout_outlasts_stray_wakeups() {
        let queue = Arc::new(JobQueue::new());
        let timeout = Duration::from_millis(60);
        let start = Instant::now();
        let waker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for _ in 0..5 {
                    thread::sleep(Duration::from_millis(5));
                    queue.added.notify_all();
                }
            })
        };
        assert!(queue.wait_for_job_timeout(timeout).is_none());
        assert!(start.elapsed() >= timeout);
        waker.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_receives_late_job() {
        let queue = Arc::new(JobQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                // an empty wakeup first, then the job
                thread::sleep(Duration::from_millis(10));
                queue.added.notify_all();
                thread::sleep(Duration::from_millis(20));
                queue.add_jobs(jobs(1));
            })
        };
        let job = queue.wait_for_job_timeout(Duration::from_secs(5));
        assert_eq!(job.map(|j| j.plane()), Some(0));
        producer.join().unwrap();
    }

    #[test]
    fn test_skipped_job_is_untouched() {
        let transform = BlockTransform::new(B, B).unwrap();
        let mut block = FrequencyBlock::new(&transform);
        let mut job = jobs(1).remove(0);
        job.mark_skipped();
        job.run(&transform, &mut block).unwrap();
        assert!(!job.output().is_allocated());

        let mut job = jobs(1).remove(0);
        job.run(&transform, &mut block).unwrap();
        assert!(job.output().is_allocated());
        assert_eq!(job.input().dimensions(), (B, B));
    }
}
