//! Wiring of the shared home components

use crate::behavior::BehaviorStore;
use crate::config::HomeConfig;
use crate::event_log::EventLog;
use crate::gateway::CommandGateway;
use crate::state::StateModel;
use device_link::DeviceClient;
use std::sync::Arc;

/// Shared handles to every piece of home state
///
/// Cloning is cheap; all clones point at the same state.
#[derive(Clone)]
pub struct Home {
    pub state: Arc<StateModel>,
    pub log: Arc<EventLog>,
    pub behavior: Arc<BehaviorStore>,
    pub gateway: Arc<CommandGateway>,
}

impl Home {
    /// Load persisted behavior and build the command gateway
    pub async fn open(config: &HomeConfig, client: Arc<dyn DeviceClient>) -> Self {
        let state = Arc::new(StateModel::new());
        let log = Arc::new(EventLog::new());
        let behavior = Arc::new(BehaviorStore::load(config.behavior_path()).await);
        let gateway = Arc::new(
            CommandGateway::new(client, state.clone(), log.clone(), behavior.clone())
                .with_gesture_learning(config.learn_from_gestures),
        );

        Self {
            state,
            log,
            behavior,
            gateway,
        }
    }

    pub fn client(&self) -> &Arc<dyn DeviceClient> {
        self.gateway.client()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_link::mock::MockDeviceClient;

    #[tokio::test]
    async fn test_open_shares_components() {
        let dir = tempfile::tempdir().unwrap();
        let config = HomeConfig {
            data_dir: dir.path().to_path_buf(),
            ..HomeConfig::default()
        };
        let home = Home::open(&config, Arc::new(MockDeviceClient::new())).await;

        assert!(Arc::ptr_eq(&home.state, home.gateway.state()));
        assert!(Arc::ptr_eq(&home.log, home.gateway.log()));
        assert_eq!(home.behavior.path(), config.behavior_path());
    }
}
