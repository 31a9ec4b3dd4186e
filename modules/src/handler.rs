use std::marker::PhantomData;

use crate::events::IBCEvent;

pub type HandlerResult<T, E> = Result<HandlerOutput<T>, E>;

#[derive(Clone, Debug)]
pub struct HandlerOutput<T> {
    pub result: T,
    pub log: Vec<String>,
    pub events: Vec<IBCEvent>,
}

impl<T> HandlerOutput<T> {
    pub fn builder() -> HandlerOutputBuilder<T> {
        HandlerOutputBuilder::new()
    }

    /// Turns the output of a sub-handler into an output for an enclosing result type.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> HandlerOutput<U> {
        HandlerOutput {
            result: f(self.result),
            log: self.log,
            events: self.events,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandlerOutputBuilder<T> {
    log: Vec<String>,
    events: Vec<IBCEvent>,
    marker: PhantomData<T>,
}

impl<T> HandlerOutputBuilder<T> {
    pub fn new() -> Self {
        Self {
            log: vec![],
            events: vec![],
            marker: PhantomData,
        }
    }

    pub fn with_log(mut self, log: impl Into<Vec<String>>) -> Self {
        self.log.append(&mut log.into());
        self
    }

    pub fn log(&mut self, log: impl Into<String>) {
        self.log.push(log.into());
    }

    pub fn with_events(mut self, events: impl Into<Vec<IBCEvent>>) -> Self {
        self.events.append(&mut events.into());
        self
    }

    pub fn emit(&mut self, event: impl Into<IBCEvent>) {
        self.events.push(event.into());
    }

    pub fn with_result(self, result: T) -> HandlerOutput<T> {
        HandlerOutput {
            result,
            log: self.log,
            events: self.events,
        }
    }
}
