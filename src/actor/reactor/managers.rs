use slotmap::SlotMap;

use crate::model::container::{Container, ContainerId};
use crate::model::output::{Output, OutputId, OutputStateCache};
use crate::model::toplevel::{Toplevel, ToplevelId};

/// Owns every toplevel and the global toplevel order.
#[derive(Debug, Default)]
pub struct ToplevelManager {
    pub toplevels: SlotMap<ToplevelId, Toplevel>,
    /// Creation order.
    pub order: Vec<ToplevelId>,
}

impl ToplevelManager {
    pub fn insert(&mut self, toplevel: Toplevel) -> ToplevelId {
        let id = self.toplevels.insert(toplevel);
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: ToplevelId) -> Option<Toplevel> {
        self.order.retain(|t| *t != id);
        self.toplevels.remove(id)
    }

    pub fn get(&self, id: ToplevelId) -> Option<&Toplevel> { self.toplevels.get(id) }

    pub fn get_mut(&mut self, id: ToplevelId) -> Option<&mut Toplevel> { self.toplevels.get_mut(id) }
}

/// Owns every container and the server-wide insert mark.
#[derive(Debug, Default)]
pub struct ContainerManager {
    pub containers: SlotMap<ContainerId, Container>,
    pub order: Vec<ContainerId>,
    /// Container that the next mapped toplevel joins instead of getting its own.
    pub insert_marked: Option<ContainerId>,
}

impl ContainerManager {
    pub fn insert(&mut self, container: Container) -> ContainerId {
        let id = self.containers.insert(container);
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: ContainerId) -> Option<Container> {
        self.order.retain(|c| *c != id);
        if self.insert_marked == Some(id) {
            self.insert_marked = None;
        }
        self.containers.remove(id)
    }

    pub fn get(&self, id: ContainerId) -> Option<&Container> { self.containers.get(id) }

    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(id)
    }
}

/// Owns the outputs, the headless fallback and the restoration cache.
#[derive(Debug)]
pub struct OutputManager {
    pub outputs: SlotMap<OutputId, Output>,
    /// Real outputs sorted top-left to bottom-right. The fallback is never
    /// part of the list.
    pub order: Vec<OutputId>,
    pub focused: OutputId,
    pub fallback: OutputId,
    pub cache: OutputStateCache,
}

impl OutputManager {
    pub fn new(fallback: Output) -> Self {
        let mut outputs = SlotMap::with_key();
        let fallback = outputs.insert(fallback);
        Self {
            outputs,
            order: Vec::new(),
            focused: fallback,
            fallback,
            cache: OutputStateCache::default(),
        }
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> { self.outputs.get(id) }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> { self.outputs.get_mut(id) }

    pub fn is_fallback(&self, id: OutputId) -> bool { self.fallback == id }

    pub fn by_name(&self, name: &str) -> Option<OutputId> {
        self.order.iter().copied().find(|id| self.outputs.get(*id).is_some_and(|o| o.name == name))
    }

    /// First enabled real output whose layout box holds the point.
    pub fn at(&self, x: i32, y: i32) -> Option<OutputId> {
        self.order.iter().copied().find(|id| {
            self.outputs.get(*id).is_some_and(|o| o.enabled && o.layout_box.contains_point(x, y))
        })
    }
}
