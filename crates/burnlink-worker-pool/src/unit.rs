// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Execution units: one OS thread each, running one task at a time.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::PoolError;
use crate::handler::TaskHandler;

pub(crate) type UnitId = u64;

pub(crate) type Reply<H> = oneshot::Sender<
	Result<<H as TaskHandler>::Response, PoolError<<H as TaskHandler>::Error>>,
>;

/// A submitted request and the channel its result goes back on.
pub(crate) struct Task<H: TaskHandler> {
	pub request: H::Request,
	pub reply: Reply<H>,
	pub operation: &'static str,
}

/// Reports from units to the dispatcher.
#[derive(Debug)]
pub(crate) enum UnitEvent {
	Idle(UnitId),
	Faulted(UnitId),
}

/// Dispatcher-side handle to a running unit.
pub(crate) struct UnitHandle<H: TaskHandler> {
	inbox: mpsc::UnboundedSender<Task<H>>,
}

impl<H: TaskHandler> UnitHandle<H> {
	/// Hands a task to the unit. Gives the task back if the unit is gone.
	pub fn assign(&self, task: Task<H>) -> Result<(), Task<H>> {
		self.inbox.send(task).map_err(|e| e.0)
	}
}

pub(crate) fn spawn_unit<H: TaskHandler>(
	pool_name: &str,
	id: UnitId,
	handler: Arc<H>,
	events: mpsc::UnboundedSender<UnitEvent>,
) -> std::io::Result<UnitHandle<H>> {
	let (inbox, tasks) = mpsc::unbounded_channel();

	std::thread::Builder::new()
		.name(format!("{pool_name}-unit-{id}"))
		.spawn(move || run_unit(id, handler, tasks, events))?;

	Ok(UnitHandle { inbox })
}

fn run_unit<H: TaskHandler>(
	id: UnitId,
	handler: Arc<H>,
	mut tasks: mpsc::UnboundedReceiver<Task<H>>,
	events: mpsc::UnboundedSender<UnitEvent>,
) {
	let guard = FaultGuard { id, events };

	while let Some(Task {
		request,
		reply,
		operation,
	}) = tasks.blocking_recv()
	{
		let span = tracing::debug_span!("pool_task", unit = id, operation);
		let _entered = span.enter();

		// On panic `reply` is dropped during unwinding, so the caller sees the
		// fault before the guard reports it.
		let result = handler.handle(request).map_err(PoolError::Operation);
		if reply.send(result).is_err() {
			tracing::debug!("caller went away before the result was ready");
		}

		if guard.events.send(UnitEvent::Idle(id)).is_err() {
			break;
		}
	}

	tracing::trace!(unit = id, "execution unit exiting");
}

struct FaultGuard {
	id: UnitId,
	events: mpsc::UnboundedSender<UnitEvent>,
}

impl Drop for FaultGuard {
	fn drop(&mut self) {
		if std::thread::panicking() {
			let _ = self.events.send(UnitEvent::Faulted(self.id));
		}
	}
}
