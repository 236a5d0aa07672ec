// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dispatcher actor that owns the units, the idle list and the pending queue.
//!
//! Invariant: whenever `pending` is non-empty, `idle` is empty. Submissions only
//! take idle units and a released unit always takes the pending head first, which
//! keeps dispatch in FIFO order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::PoolError;
use crate::handler::TaskHandler;
use crate::pool::PoolStats;
use crate::unit::{spawn_unit, Task, UnitEvent, UnitHandle, UnitId};

pub(crate) enum Command<H: TaskHandler> {
	Submit(Task<H>),
	Stats(oneshot::Sender<PoolStats>),
	Close(oneshot::Sender<()>),
}

pub(crate) struct Dispatcher<H: TaskHandler> {
	name: String,
	handler: Arc<H>,
	commands: mpsc::UnboundedReceiver<Command<H>>,
	events_tx: mpsc::UnboundedSender<UnitEvent>,
	events: mpsc::UnboundedReceiver<UnitEvent>,
	units: HashMap<UnitId, UnitHandle<H>>,
	idle: VecDeque<UnitId>,
	pending: VecDeque<Task<H>>,
	next_unit_id: UnitId,
	faults: u64,
}

impl<H: TaskHandler> Dispatcher<H> {
	/// Starts `size` units. Fails if any unit thread cannot be spawned.
	pub fn start(
		name: String,
		handler: Arc<H>,
		size: usize,
		commands: mpsc::UnboundedReceiver<Command<H>>,
	) -> std::io::Result<Self> {
		let (events_tx, events) = mpsc::unbounded_channel();
		let mut dispatcher = Self {
			name,
			handler,
			commands,
			events_tx,
			events,
			units: HashMap::with_capacity(size),
			idle: VecDeque::with_capacity(size),
			pending: VecDeque::new(),
			next_unit_id: 0,
			faults: 0,
		};

		for _ in 0..size {
			let id = dispatcher.spawn_unit()?;
			dispatcher.idle.push_back(id);
		}

		Ok(dispatcher)
	}

	pub async fn run(mut self) {
		let closed = loop {
			tokio::select! {
				biased;
				// The dispatcher holds `events_tx`, so this channel never closes.
				Some(event) = self.events.recv() => self.handle_event(event),
				cmd = self.commands.recv() => {
					let Some(cmd) = cmd else {
						break None;
					};
					match cmd {
						Command::Submit(task) => self.submit(task),
						Command::Stats(reply) => {
							let _ = reply.send(self.stats());
						}
						Command::Close(reply) => break Some(reply),
					}
				}
			}
		};

		self.shutdown();

		if let Some(reply) = closed {
			let _ = reply.send(());
		}
	}

	fn spawn_unit(&mut self) -> std::io::Result<UnitId> {
		let id = self.next_unit_id;
		self.next_unit_id += 1;

		let unit = spawn_unit(&self.name, id, Arc::clone(&self.handler), self.events_tx.clone())?;
		self.units.insert(id, unit);
		Ok(id)
	}

	fn submit(&mut self, mut task: Task<H>) {
		while let Some(id) = self.idle.pop_front() {
			match self.assign(id, task) {
				Ok(()) => return,
				Err(returned) => task = returned,
			}
		}

		tracing::trace!(
			pool = %self.name,
			operation = task.operation,
			queued = self.pending.len() + 1,
			"all units busy, queueing task"
		);
		self.pending.push_back(task);
	}

	fn assign(&mut self, id: UnitId, task: Task<H>) -> Result<(), Task<H>> {
		let Some(unit) = self.units.get(&id) else {
			return Err(task);
		};

		let result = unit.assign(task);
		if result.is_err() {
			tracing::debug!(pool = %self.name, unit = id, "unit inbox closed, dropping unit");
			self.units.remove(&id);
		}
		result
	}

	/// A unit is free: give it the oldest pending task or park it as idle.
	fn release(&mut self, id: UnitId) {
		match self.pending.pop_front() {
			Some(task) => {
				if let Err(task) = self.assign(id, task) {
					self.pending.push_front(task);
				}
			}
			None => self.idle.push_back(id),
		}
	}

	fn handle_event(&mut self, event: UnitEvent) {
		match event {
			UnitEvent::Idle(id) => self.release(id),
			UnitEvent::Faulted(id) => {
				self.faults += 1;
				self.units.remove(&id);
				tracing::warn!(
					pool = %self.name,
					unit = id,
					faults = self.faults,
					"execution unit faulted, starting replacement"
				);

				match self.spawn_unit() {
					Ok(replacement) => self.release(replacement),
					Err(e) => tracing::error!(
						pool = %self.name,
						error = %e,
						"failed to start replacement unit, pool capacity reduced"
					),
				}
			}
		}
	}

	fn stats(&self) -> PoolStats {
		PoolStats {
			size: self.units.len(),
			idle: self.idle.len(),
			pending: self.pending.len(),
			faults: self.faults,
		}
	}

	fn shutdown(&mut self) {
		let mut rejected = self.pending.len();
		for task in self.pending.drain(..) {
			let _ = task.reply.send(Err(PoolError::Closed));
		}

		// Dropping the inboxes lets each unit exit after its current task.
		self.idle.clear();
		self.units.clear();

		// Commands sent before the receiver closed are still buffered.
		self.commands.close();
		while let Ok(cmd) = self.commands.try_recv() {
			match cmd {
				Command::Submit(task) => {
					rejected += 1;
					let _ = task.reply.send(Err(PoolError::Closed));
				}
				Command::Stats(reply) => {
					let _ = reply.send(self.stats());
				}
				Command::Close(reply) => {
					let _ = reply.send(());
				}
			}
		}

		tracing::info!(pool = %self.name, rejected, "worker pool closed");
	}
}
