// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resumable build tasks.
//!
//! A worker never runs a build to completion inside a reactor callback. It
//! holds an [`AssemblyBuilder`] and calls [`AssemblyBuilder::advance`] once per
//! build tick; each call does a bounded amount of work and returns.

use crate::assembly::{AssemblyDescriptor, AssemblyId, AssemblyResult};

/// Progress reported by one [`AssemblyBuilder::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// More work remains
    Pending,
    /// The build is over; the builder should not be advanced again
    Finished(AssemblyResult),
}

/// One build in progress.
pub trait AssemblyBuilder: Send {
    /// The assembly being built.
    fn assembly_id(&self) -> AssemblyId;

    /// Do the next bounded unit of work. Must not block.
    fn advance(&mut self) -> BuildStep;
}

/// Creates builders for incoming assemblies.
pub trait BuilderFactory: Send {
    fn start(&mut self, descriptor: AssemblyDescriptor) -> Box<dyn AssemblyBuilder>;
}

/// Builder that succeeds after a fixed number of steps.
///
/// Stands in for the real build subsystem.
#[derive(Debug, Clone)]
pub struct StepBuilder {
    descriptor: AssemblyDescriptor,
    remaining: u32,
}

impl StepBuilder {
    pub fn new(descriptor: AssemblyDescriptor, steps: u32) -> Self {
        Self { descriptor, remaining: steps }
    }
}

impl AssemblyBuilder for StepBuilder {
    fn assembly_id(&self) -> AssemblyId {
        self.descriptor.id
    }

    fn advance(&mut self) -> BuildStep {
        if self.remaining > 0 {
            self.remaining -= 1;
            return BuildStep::Pending;
        }
        BuildStep::Finished(AssemblyResult::succeeded(
            self.descriptor.id,
            format!("built {}@{}", self.descriptor.repository, self.descriptor.revision),
        ))
    }
}

/// Factory for [`StepBuilder`]s.
#[derive(Debug, Clone, Copy)]
pub struct StepBuilderFactory {
    pub steps: u32,
}

impl Default for StepBuilderFactory {
    fn default() -> Self {
        Self { steps: 3 }
    }
}

impl BuilderFactory for StepBuilderFactory {
    fn start(&mut self, descriptor: AssemblyDescriptor) -> Box<dyn AssemblyBuilder> {
        Box::new(StepBuilder::new(descriptor, self.steps))
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
