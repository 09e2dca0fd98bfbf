use thiserror::Error;

use crate::model::container::ContainerId;
use crate::model::output::OutputId;
use crate::model::toplevel::ToplevelId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReactorError {
    #[error("toplevel {0:?} no longer exists")]
    StaleToplevel(ToplevelId),
    #[error("container {0:?} no longer exists")]
    StaleContainer(ContainerId),
    #[error("output {0:?} no longer exists")]
    StaleOutput(OutputId),
    #[error("toplevel {0:?} is not held by any container")]
    Uncontained(ToplevelId),
}
