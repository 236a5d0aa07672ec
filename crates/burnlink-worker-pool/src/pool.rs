// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::dispatcher::{Command, Dispatcher};
use crate::error::PoolError;
use crate::handler::TaskHandler;
use crate::unit::Task;

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
	/// Live execution units.
	pub size: usize,
	pub idle: usize,
	/// Tasks waiting for a free unit.
	pub pending: usize,
	/// Units lost to panics since the pool started.
	pub faults: u64,
}

/// Number of units used when none is configured.
pub fn default_pool_size() -> usize {
	std::thread::available_parallelism()
		.map(NonZeroUsize::get)
		.unwrap_or(1)
		.max(1)
}

/// Fixed-size pool of OS threads running a [`TaskHandler`].
///
/// Tasks are dispatched in submission order. When a unit panics, the task it
/// was running fails with [`PoolError::UnitFault`] and exactly one replacement
/// unit is started, so capacity is restored without affecting other tasks.
pub struct WorkerPool<H: TaskHandler> {
	name: String,
	size: usize,
	commands: mpsc::UnboundedSender<Command<H>>,
	dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<H: TaskHandler> WorkerPool<H> {
	/// Starts a pool with `size` units. Must be called within a tokio runtime.
	pub fn new(
		name: impl Into<String>,
		handler: H,
		size: usize,
	) -> Result<Self, PoolError<H::Error>> {
		let name = name.into();
		let size = size.max(1);
		let (commands, rx) = mpsc::unbounded_channel();

		let dispatcher = Dispatcher::start(name.clone(), Arc::new(handler), size, rx)?;
		let handle = tokio::spawn(dispatcher.run());

		tracing::info!(pool = %name, size, "worker pool started");

		Ok(Self {
			name,
			size,
			commands,
			dispatcher: Mutex::new(Some(handle)),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Configured number of units.
	pub fn size(&self) -> usize {
		self.size
	}

	/// Runs `request` on the next free unit and waits for its result.
	pub async fn execute(&self, request: H::Request) -> Result<H::Response, PoolError<H::Error>> {
		let operation = H::operation(&request);
		let (reply, rx) = oneshot::channel();

		self.commands
			.send(Command::Submit(Task {
				request,
				reply,
				operation,
			}))
			.map_err(|_| PoolError::Closed)?;

		match rx.await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(pool = %self.name, operation, "task lost to a faulted execution unit");
				Err(PoolError::UnitFault)
			}
		}
	}

	pub async fn stats(&self) -> Result<PoolStats, PoolError<H::Error>> {
		let (reply, rx) = oneshot::channel();
		self.commands
			.send(Command::Stats(reply))
			.map_err(|_| PoolError::Closed)?;
		rx.await.map_err(|_| PoolError::Closed)
	}

	/// Stops accepting work and fails every queued task with
	/// [`PoolError::Closed`]. Tasks already running finish normally. Calling
	/// this more than once is harmless.
	pub async fn close(&self) {
		let (reply, rx) = oneshot::channel();
		if self.commands.send(Command::Close(reply)).is_ok() {
			let _ = rx.await;
		}

		if let Some(handle) = self.dispatcher.lock().await.take() {
			if let Err(e) = handle.await {
				tracing::error!(pool = %self.name, error = %e, "worker pool dispatcher failed");
			}
		}
	}
}

impl<H: TaskHandler> std::fmt::Debug for WorkerPool<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field("name", &self.name)
			.field("size", &self.size)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	#[derive(Debug, thiserror::Error)]
	#[error("request rejected")]
	struct Rejected;

	enum Request {
		Echo(u64),
		Sleep(Duration, u64),
		Record(u64),
		Fail,
		Panic,
	}

	#[derive(Default)]
	struct Recorder {
		executions: AtomicUsize,
		order: std::sync::Mutex<Vec<u64>>,
	}

	struct TestHandler {
		recorder: Arc<Recorder>,
	}

	impl TaskHandler for TestHandler {
		type Request = Request;
		type Response = u64;
		type Error = Rejected;

		fn operation(request: &Request) -> &'static str {
			match request {
				Request::Echo(_) => "echo",
				Request::Sleep(..) => "sleep",
				Request::Record(_) => "record",
				Request::Fail => "fail",
				Request::Panic => "panic",
			}
		}

		fn handle(&self, request: Request) -> Result<u64, Rejected> {
			self.recorder.executions.fetch_add(1, Ordering::SeqCst);
			match request {
				Request::Echo(n) => Ok(n),
				Request::Sleep(d, n) => {
					std::thread::sleep(d);
					Ok(n)
				}
				Request::Record(n) => {
					self.recorder.order.lock().unwrap().push(n);
					Ok(n)
				}
				Request::Fail => Err(Rejected),
				Request::Panic => panic!("unit crashed"),
			}
		}
	}

	fn pool(size: usize) -> (WorkerPool<TestHandler>, Arc<Recorder>) {
		let recorder = Arc::new(Recorder::default());
		let handler = TestHandler {
			recorder: Arc::clone(&recorder),
		};
		(WorkerPool::new("test", handler, size).unwrap(), recorder)
	}

	#[tokio::test]
	async fn execute_returns_handler_result() {
		let (pool, _) = pool(2);
		assert_eq!(pool.execute(Request::Echo(7)).await.unwrap(), 7);
		pool.close().await;
	}

	#[tokio::test]
	async fn zero_size_is_clamped_to_one() {
		let (pool, _) = pool(0);
		assert_eq!(pool.size(), 1);
		assert_eq!(pool.stats().await.unwrap().size, 1);
		pool.close().await;
	}

	#[test]
	fn default_size_is_at_least_one() {
		assert!(default_pool_size() >= 1);
	}

	#[tokio::test]
	async fn operation_error_is_not_a_fault() {
		let (pool, _) = pool(1);

		let err = pool.execute(Request::Fail).await.unwrap_err();
		assert!(matches!(err, PoolError::Operation(Rejected)));

		assert_eq!(pool.execute(Request::Echo(1)).await.unwrap(), 1);
		let stats = pool.stats().await.unwrap();
		assert_eq!(stats.faults, 0);
		assert_eq!(stats.size, 1);
		pool.close().await;
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn every_task_completes_exactly_once() {
		let (pool, recorder) = pool(3);

		let results = futures::future::join_all(
			(0..40).map(|n| pool.execute(Request::Sleep(Duration::from_millis(2), n))),
		)
		.await;

		let seen: HashSet<u64> = results.into_iter().map(|r| r.unwrap()).collect();
		assert_eq!(seen.len(), 40);
		assert_eq!(recorder.executions.load(Ordering::SeqCst), 40);
		pool.close().await;
	}

	#[tokio::test]
	async fn queued_tasks_run_in_submission_order() {
		let (pool, recorder) = pool(1);

		let mut tasks = vec![pool.execute(Request::Sleep(Duration::from_millis(50), 0))];
		tasks.extend((1..=5).map(|n| pool.execute(Request::Record(n))));
		for result in futures::future::join_all(tasks).await {
			result.unwrap();
		}

		assert_eq!(*recorder.order.lock().unwrap(), vec![1, 2, 3, 4, 5]);
		pool.close().await;
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn panicking_unit_fails_only_its_task_and_is_replaced() {
		let (pool, _) = pool(2);

		let mut tasks: Vec<_> = (0..10)
			.map(|n| pool.execute(Request::Sleep(Duration::from_millis(5), n)))
			.collect();
		tasks.insert(3, pool.execute(Request::Panic));

		let results = futures::future::join_all(tasks).await;
		let faults = results
			.iter()
			.filter(|r| matches!(r, Err(PoolError::UnitFault)))
			.count();
		let successes = results.iter().filter(|r| r.is_ok()).count();
		assert_eq!(faults, 1);
		assert_eq!(successes, 10);

		// Replacement registration races the faulted reply; wait for it.
		let mut stats = pool.stats().await.unwrap();
		for _ in 0..50 {
			if stats.faults == 1 && stats.size == 2 {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
			stats = pool.stats().await.unwrap();
		}
		assert_eq!(stats.faults, 1);
		assert_eq!(stats.size, 2);

		assert_eq!(pool.execute(Request::Echo(99)).await.unwrap(), 99);
		pool.close().await;
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn close_rejects_queued_and_new_tasks() {
		let (pool, _) = pool(1);
		let pool = Arc::new(pool);

		let running = {
			let pool = Arc::clone(&pool);
			tokio::spawn(async move {
				pool.execute(Request::Sleep(Duration::from_millis(100), 1))
					.await
			})
		};
		tokio::time::sleep(Duration::from_millis(20)).await;

		let queued = {
			let pool = Arc::clone(&pool);
			tokio::spawn(async move { pool.execute(Request::Echo(2)).await })
		};
		tokio::time::sleep(Duration::from_millis(20)).await;

		pool.close().await;

		assert!(matches!(queued.await.unwrap(), Err(PoolError::Closed)));
		assert_eq!(running.await.unwrap().unwrap(), 1);
		assert!(matches!(
			pool.execute(Request::Echo(3)).await,
			Err(PoolError::Closed)
		));
		assert!(matches!(pool.stats().await, Err(PoolError::Closed)));

		pool.close().await;
	}

	#[tokio::test]
	async fn submissions_behind_close_are_rejected_as_closed() {
		let recorder = Arc::new(Recorder::default());
		let handler = Arc::new(TestHandler {
			recorder: Arc::clone(&recorder),
		});
		let (commands, rx) = mpsc::unbounded_channel();
		let dispatcher = Dispatcher::start("drain".to_string(), handler, 1, rx).unwrap();

		// Everything below is already buffered when the dispatcher takes Close.
		let (close_reply, closed) = oneshot::channel();
		commands.send(Command::Close(close_reply)).unwrap();
		let mut replies = Vec::new();
		for n in 0..3 {
			let (reply, rx) = oneshot::channel();
			commands
				.send(Command::Submit(Task {
					request: Request::Echo(n),
					reply,
					operation: "echo",
				}))
				.unwrap();
			replies.push(rx);
		}
		let (stats_reply, stats) = oneshot::channel();
		commands.send(Command::Stats(stats_reply)).unwrap();
		let (second_close, second_closed) = oneshot::channel();
		commands.send(Command::Close(second_close)).unwrap();

		dispatcher.run().await;

		closed.await.unwrap();
		second_closed.await.unwrap();
		for rx in replies {
			assert!(matches!(rx.await.unwrap(), Err(PoolError::Closed)));
		}
		assert_eq!(stats.await.unwrap().pending, 0);
		assert_eq!(recorder.executions.load(Ordering::SeqCst), 0);

		let (late, _) = oneshot::channel();
		assert!(commands.send(Command::Stats(late)).is_err());
	}
}
