//! Deployment lifecycle state machine.

use crate::error::RouterError;

/// Lifecycle state of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentState {
    /// Not (or no longer) known to the registry.
    #[default]
    Undeployed,
    /// Registered, not yet serving.
    Deployed,
    /// Routed and serving requests.
    Started,
    /// Removed from routing; may be started again or undeployed.
    Stopped,
}

impl DeploymentState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Undeployed -> Deployed
    /// - Deployed -> Started
    /// - Started -> Stopped
    /// - Stopped -> Started
    /// - Deployed -> Undeployed
    /// - Stopped -> Undeployed
    pub fn can_transition_to(&self, target: DeploymentState) -> bool {
        use DeploymentState::*;
        matches!(
            (*self, target),
            (Undeployed, Deployed)
                | (Deployed, Started)
                | (Started, Stopped)
                | (Stopped, Started)
                | (Deployed, Undeployed)
                | (Stopped, Undeployed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// `action` and `context_path` only feed the error message.
    pub fn transition_to(
        &mut self,
        target: DeploymentState,
        context_path: &str,
        action: &'static str,
    ) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(RouterError::IllegalState {
                context_path: context_path.to_string(),
                state: *self,
                action,
            })
        }
    }

    /// Check if the deployment is receiving requests.
    pub fn is_serving(&self) -> bool {
        matches!(self, DeploymentState::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = DeploymentState::default();
        assert!(state.transition_to(DeploymentState::Deployed, "/a", "deploy").is_ok());
        assert!(state.transition_to(DeploymentState::Started, "/a", "start").is_ok());
        assert!(state.is_serving());
        assert!(state.transition_to(DeploymentState::Stopped, "/a", "stop").is_ok());
        assert!(state.transition_to(DeploymentState::Started, "/a", "start").is_ok());
        assert!(state.transition_to(DeploymentState::Stopped, "/a", "stop").is_ok());
        assert!(state.transition_to(DeploymentState::Undeployed, "/a", "undeploy").is_ok());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut state = DeploymentState::Started;
        let err = state
            .transition_to(DeploymentState::Started, "/a", "start")
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::IllegalState {
                state: DeploymentState::Started,
                action: "start",
                ..
            }
        ));
        // State should remain unchanged
        assert_eq!(state, DeploymentState::Started);
    }

    #[test]
    fn test_invalid_transitions() {
        use DeploymentState::*;
        assert!(!Deployed.can_transition_to(Stopped));
        assert!(!Started.can_transition_to(Undeployed));
        assert!(!Undeployed.can_transition_to(Started));
        assert!(!Stopped.can_transition_to(Stopped));
    }

    #[test]
    fn test_default() {
        assert_eq!(DeploymentState::default(), DeploymentState::Undeployed);
    }
}
