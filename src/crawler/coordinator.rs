//! Spider lifecycle and crawl loop
//!
//! A [`Spider`] owns one background crawl. Control calls (`set_seed`, `start`,
//! `stop`, `on_complete`) may come from any task and synchronize on a single
//! lifecycle lock. The crawl loop itself runs on its own Tokio task, which owns
//! the frontier, the fetcher and the store for the whole run.
//!
//! Each cycle waits out the fetch gap, checks for a stop request and the movie
//! budget, then fetches one movie page, persists what it found and pushes the
//! related movies onto the frontier. Whatever is left in the frontier when the
//! loop ends is saved as resumable ids for the next run.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::extract_page;
use crate::model::{Entity, Movie};
use crate::storage::{SqliteStore, Store};
use crate::url::MovieSite;
use crate::SpiderError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a spider
///
/// `Stopped` is terminal: a stopped spider can't be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiderState {
    Idle,
    Running,
    StopRequested,
    Stopped,
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Lifecycle {
    state: SpiderState,
    callbacks: Vec<Callback>,

    /// Set once every queued callback has run
    callbacks_done: bool,
}

/// State shared between the control handle and the crawl task
struct Shared {
    lifecycle: Mutex<Lifecycle>,

    /// Wakes the crawl loop out of its fetch-gap wait
    wake: CancellationToken,

    done: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_requested(&self) -> bool {
        self.lock().state == SpiderState::StopRequested
    }

    /// Marks the run stopped, then runs callbacks and releases waiters
    ///
    /// Callbacks registered while earlier ones are running are queued behind
    /// them, so registration order holds until the queue is empty.
    fn finish(&self) {
        self.lock().state = SpiderState::Stopped;

        loop {
            let callbacks = {
                let mut lifecycle = self.lock();
                if lifecycle.callbacks.is_empty() {
                    lifecycle.callbacks_done = true;
                    break;
                }
                std::mem::take(&mut lifecycle.callbacks)
            };

            for callback in callbacks {
                run_callback(callback);
            }
        }

        self.done.send_replace(true);
    }
}

fn run_callback(callback: Callback) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::error!("Completion callback panicked");
    }
}

/// Resolves once a spider has stopped and its callbacks have run
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<bool>,
}

impl Completion {
    pub async fn wait(mut self) {
        // An Err means the spider was dropped without ever running
        let _ = self.rx.wait_for(|done| *done).await;
    }

    pub fn is_done(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Everything the crawl task owns
struct Worker<F, S> {
    fetcher: F,
    store: S,
    site: MovieSite,
    frontier: Frontier,
    fetch_gap: Duration,

    /// Maximum movies visited per run, 0 for no limit
    max_movies: usize,
}

/// A resumable movie crawler
///
/// # Example
///
/// ```no_run
/// use movie_spider::config::Config;
/// use movie_spider::Spider;
///
/// # async fn example() -> Result<(), movie_spider::SpiderError> {
/// let spider = Spider::from_config(&Config::default())?;
/// spider.set_seed("3266615")?;
/// spider.on_complete(|| println!("done"));
/// spider.start()?;
/// spider.completion().wait().await;
/// # Ok(())
/// # }
/// ```
pub struct Spider<F, S> {
    shared: Arc<Shared>,

    /// Handed over to the crawl task on start
    worker: Mutex<Option<Worker<F, S>>>,
}

impl Spider<HttpFetcher, SqliteStore> {
    /// Builds a spider that fetches over HTTP and stores into the configured database
    pub fn from_config(config: &Config) -> Result<Self, SpiderError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent)?;
        let store = SqliteStore::new(&config.output.database_path);
        let site = MovieSite::new(&config.site.base_url)?;
        Ok(Self::new(fetcher, store, site, &config.crawler))
    }
}

impl<F, S> Spider<F, S>
where
    F: PageFetcher + 'static,
    S: Store + 'static,
{
    pub fn new(fetcher: F, store: S, site: MovieSite, config: &CrawlerConfig) -> Self {
        let (done, _) = watch::channel(false);
        let worker = Worker {
            fetcher,
            store,
            site,
            frontier: Frontier::new(),
            fetch_gap: config.fetch_gap(),
            max_movies: config.max_movies,
        };

        Self {
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle {
                    state: SpiderState::Idle,
                    callbacks: Vec::new(),
                    callbacks_done: false,
                }),
                wake: CancellationToken::new(),
                done,
            }),
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn state(&self) -> SpiderState {
        self.shared.lock().state
    }

    /// Adds a movie id to the frontier
    ///
    /// # Errors
    ///
    /// * `SpiderError::AlreadyStarted` - The spider has left the idle state
    pub fn set_seed(&self, movie_id: impl Into<String>) -> Result<(), SpiderError> {
        let lifecycle = self.shared.lock();
        if lifecycle.state != SpiderState::Idle {
            return Err(SpiderError::AlreadyStarted);
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let worker = worker.as_mut().ok_or(SpiderError::WorkerUnavailable)?;
        worker.frontier.push(movie_id);
        Ok(())
    }

    /// Registers a callback to run once the spider has stopped
    ///
    /// Callbacks run in registration order, after the store has been flushed.
    /// A callback registered once all queued callbacks have run is run
    /// immediately.
    pub fn on_complete(&self, callback: impl FnOnce() + Send + 'static) {
        let mut lifecycle = self.shared.lock();
        if lifecycle.callbacks_done {
            drop(lifecycle);
            run_callback(Box::new(callback));
            return;
        }
        lifecycle.callbacks.push(Box::new(callback));
    }

    pub fn completion(&self) -> Completion {
        Completion {
            rx: self.shared.done.subscribe(),
        }
    }

    /// Spawns the crawl task on the current Tokio runtime
    ///
    /// Does nothing unless the spider is idle.
    ///
    /// # Errors
    ///
    /// * `SpiderError::Runtime` - Called outside a Tokio runtime
    pub fn start(&self) -> Result<(), SpiderError> {
        let handle = Handle::try_current()?;

        let mut lifecycle = self.shared.lock();
        if lifecycle.state != SpiderState::Idle {
            tracing::debug!("Start ignored, spider is {:?}", lifecycle.state);
            return Ok(());
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SpiderError::WorkerUnavailable)?;
        lifecycle.state = SpiderState::Running;
        drop(lifecycle);

        let shared = Arc::clone(&self.shared);
        let inner = handle.clone();
        handle.spawn(async move {
            let run = inner.spawn(worker.run(Arc::clone(&shared)));
            match run.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("FATAL: crawl aborted: {}", e),
                Err(e) => tracing::error!("FATAL: crawl task failed: {}", e),
            }
            shared.finish();
        });

        Ok(())
    }

    /// Asks a running spider to stop after its current cycle
    ///
    /// Returns immediately; wait on [`Spider::completion`] or a completion
    /// callback to know when the run has ended.
    pub fn stop(&self) {
        let mut lifecycle = self.shared.lock();
        if lifecycle.state != SpiderState::Running {
            return;
        }
        lifecycle.state = SpiderState::StopRequested;
        self.shared.wake.cancel();
        tracing::info!("Stop requested");
    }
}

impl<F, S> Worker<F, S>
where
    F: PageFetcher,
    S: Store,
{
    async fn run(mut self, shared: Arc<Shared>) -> Result<(), SpiderError> {
        self.store.open()?;

        let crawled = match self.resume() {
            Ok(()) => self.crawl(&shared).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &crawled {
            tracing::error!("FATAL: crawl loop failed: {}", e);
        }

        let pending = self.drain()?;
        tracing::info!(
            "Crawl finished: {} movies parsed, {} celebrities found, {} movie ids kept for the next run",
            self.frontier.visited_movie_count(),
            self.frontier.visited_celebrity_count(),
            pending
        );

        crawled
    }

    /// Moves the ids left over by a previous run onto the frontier
    fn resume(&mut self) -> Result<(), SpiderError> {
        let resumed = self.store.load_and_clear_resumable_ids()?;
        if !resumed.is_empty() {
            tracing::info!("Resuming {} movie ids from a previous run", resumed.len());
        }
        self.frontier.extend(resumed);
        Ok(())
    }

    async fn crawl(&mut self, shared: &Shared) -> Result<(), SpiderError> {
        while !self.frontier.is_empty() {
            tokio::select! {
                _ = shared.wake.cancelled() => {}
                _ = tokio::time::sleep(self.fetch_gap) => {}
            }

            if shared.stop_requested() {
                tracing::info!("Leaving crawl loop on stop request");
                break;
            }

            if self.max_movies > 0 && self.frontier.visited_movie_count() >= self.max_movies {
                tracing::info!("Movie budget of {} reached", self.max_movies);
                break;
            }

            let Some(movie_id) = self.frontier.pop_unvisited() else {
                break;
            };
            self.crawl_movie(&movie_id).await?;
        }
        Ok(())
    }

    /// Runs one fetch, extract and persist cycle
    ///
    /// A page that can't be fetched is stored as a partial movie, so the next
    /// run retries it; only store failures abort the crawl.
    async fn crawl_movie(&mut self, movie_id: &str) -> Result<(), SpiderError> {
        let url = self.site.movie_url(movie_id);
        tracing::info!("Fetching movie {} from {}", movie_id, url);

        let movie = match self.fetcher.fetch_page(&url).await {
            Ok(html) => Movie::from_page(movie_id, extract_page(&html), &self.site),
            Err(e) => {
                tracing::warn!("Failed to fetch movie {}: {}", movie_id, e);
                Movie::new(movie_id)
            }
        };

        if movie.is_partial() {
            tracing::warn!("Movie {} is incomplete, keeping it for a later run", movie_id);
        }

        self.store.save(Entity::from(&movie), false)?;
        self.frontier.mark_movie_visited(movie_id);

        for related in &movie.related_ids {
            self.frontier.push(related.as_str());
        }

        for celebrity in &movie.celebrities {
            if self.frontier.visit_celebrity(&celebrity.id) {
                self.store.save(Entity::from(celebrity), false)?;
            }
        }

        self.store.commit()?;
        tracing::debug!(
            "Movie {} done: {} related, {} credited, {} pending",
            movie_id,
            movie.related_ids.len(),
            movie.celebrities.len(),
            self.frontier.len()
        );
        Ok(())
    }

    /// Saves every unvisited id left on the frontier as a resumable partial movie
    fn drain(&mut self) -> Result<usize, SpiderError> {
        let remaining: Vec<Movie> = self
            .frontier
            .drain_unvisited()
            .into_iter()
            .map(Movie::new)
            .collect();

        let entities: Vec<Entity<'_>> = remaining.iter().map(Entity::from).collect();
        self.store.save_all(&entities)?;
        Ok(remaining.len())
    }
}
