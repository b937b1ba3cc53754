use crate::agent::AgentId;
use crate::error::Result;
use crate::model::Model;

impl Model {
    pub(crate) fn step_patch(&mut self, id: AgentId) -> Result<()> {
        self.scheduler.patch_mut(id)?.grow();
        Ok(())
    }
}
