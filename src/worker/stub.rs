//! In-process workers for tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{CompileError, LoadError, RenderOptions, SpawnError, Worker, WorkerFactory};

/// What a stub worker does when invoked.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer with these bytes.
    Render(String),
    /// Fail with this message.
    Fail(String),
    /// Never answer.
    Hang,
    /// Answer with no bytes at all.
    Empty,
}

/// Lifecycle calls observed by a [`StubFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawn(usize),
    Load(usize, PathBuf),
    Invoke(usize, String),
    Terminate(usize),
}

#[derive(Clone)]
pub struct StubFactory {
    behavior: Behavior,
    fail_spawn: bool,
    fail_load: bool,
    events: Rc<RefCell<Vec<Event>>>,
}

/// Minimal SVG a real toolchain might produce.
pub const MINIMAL_SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="10pt" height="10pt" viewBox="0 0 10 10"><g id="page1"><path d="M0 0L10 10" stroke="#000"/></g></svg>"##;

impl StubFactory {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            fail_spawn: false,
            fail_load: false,
            events: Rc::default(),
        }
    }

    pub fn rendering() -> Self {
        Self::new(Behavior::Render(MINIMAL_SVG.into()))
    }

    pub fn failing_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn spawns(&self) -> usize {
        self.count(|e| matches!(e, Event::Spawn(_)))
    }

    pub fn terminates(&self) -> usize {
        self.count(|e| matches!(e, Event::Terminate(_)))
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl WorkerFactory for StubFactory {
    type Worker = StubWorker;

    async fn spawn(&self) -> Result<StubWorker, SpawnError> {
        if self.fail_spawn {
            return Err(SpawnError::EmptyCommand);
        }
        let id = self.spawns();
        self.record(Event::Spawn(id));
        Ok(StubWorker {
            id,
            factory: self.clone(),
        })
    }
}

pub struct StubWorker {
    id: usize,
    factory: StubFactory,
}

impl Worker for StubWorker {
    async fn load(&mut self, root: &Path) -> Result<(), LoadError> {
        self.factory.record(Event::Load(self.id, root.to_owned()));
        if self.factory.fail_load {
            return Err(LoadError::new(root, "resources unavailable"));
        }
        Ok(())
    }

    async fn invoke(&mut self, source: &str, _: &RenderOptions) -> Result<Vec<u8>, CompileError> {
        self.factory.record(Event::Invoke(self.id, source.to_owned()));
        match &self.factory.behavior {
            Behavior::Render(svg) => Ok(svg.clone().into_bytes()),
            Behavior::Fail(message) => Err(CompileError::Rejected(message.clone())),
            Behavior::Hang => std::future::pending().await,
            Behavior::Empty => Ok(Vec::new()),
        }
    }

    async fn terminate(self) {
        self.factory.record(Event::Terminate(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{embed, extract};

    #[test]
    fn test_minimal_svg_is_complete() {
        assert!(MINIMAL_SVG.contains(r##"stroke="#000""##));
        assert!(MINIMAL_SVG.ends_with("</svg>"));

        let artifact = embed(MINIMAL_SVG.as_bytes(), "\\draw;", chrono::Utc::now()).unwrap();
        assert!(artifact.svg().contains(r#"<g id="page1">"#));
        assert_eq!(extract(artifact.as_bytes()).as_deref(), Some("\\draw;"));
    }
}
