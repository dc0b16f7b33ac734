use fxhash::FxHashMap;
use log::trace;

use crate::{Dispatch, Error, Resource, ResourceState, Result};

/// Change of resource's state that has to be waited on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrier {
    pub resource: Resource,
    pub from: Option<ResourceState>,
    pub to: ResourceState,
}

/// Keeps track of the state each resource is in and rejects accesses that
/// weren't preceded by an appropriate transition.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    states: FxHashMap<Resource, ResourceState>,
}

impl ResourceTracker {
    /// Records a transition; returns a barrier if the state actually
    /// changes.
    pub fn transition(
        &mut self,
        resource: Resource,
        state: ResourceState,
    ) -> Option<Barrier> {
        let from = self.states.insert(resource, state);

        if from == Some(state) {
            return None;
        }

        trace!("Barrier: {resource:?}: {from:?} -> {state:?}");

        Some(Barrier {
            resource,
            from,
            to: state,
        })
    }

    pub fn state(&self, resource: Resource) -> Option<ResourceState> {
        self.states.get(&resource).copied()
    }

    pub fn validate(&self, dispatch: &Dispatch<'_>) -> Result<()> {
        for output in dispatch.outputs {
            if dispatch.inputs.contains(output) {
                return Err(Error::Aliased(*output));
            }
        }

        for &input in dispatch.inputs {
            self.expect(input, ResourceState::ShaderRead)?;
        }

        for &output in dispatch.outputs {
            self.expect(output, ResourceState::ShaderWrite)?;
        }

        Ok(())
    }

    pub fn expect(
        &self,
        resource: Resource,
        expected: ResourceState,
    ) -> Result<()> {
        let actual = self.state(resource);

        if actual == Some(expected) {
            Ok(())
        } else {
            Err(Error::Unsynchronized {
                resource,
                expected,
                actual,
            })
        }
    }
}
