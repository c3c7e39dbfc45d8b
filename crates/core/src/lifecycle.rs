//! The install/activate lifecycle state machine.
//!
//! The manager moves through `Uninstalled → Installing → Installed →
//! Activating → Active`, with `Failed` as the terminal state of a broken
//! install. `transition` is a pure function over (state, event): all side
//! effects come back as an explicit effect list for the driver to run, which
//! keeps every transition testable without a network or storage layer.

use crate::Error;

/// Lifecycle states of the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// No generation has been opened yet.
    Uninstalled,
    /// The manifest precache for `version` is in flight.
    Installing { version: String },
    /// The generation for `version` is fully precached and ready.
    Installed { version: String },
    /// Stale generations are being purged and `version` promoted.
    Activating { version: String },
    /// `version` is current; fetch interception is live.
    Active { version: String },
    /// The install of `version` failed; the deployment attempt is dead.
    Failed { version: String },
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing { .. } => "installing",
            LifecycleState::Installed { .. } => "installed",
            LifecycleState::Activating { .. } => "activating",
            LifecycleState::Active { .. } => "active",
            LifecycleState::Failed { .. } => "failed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LifecycleState::Active { .. })
    }
}

/// Lifecycle events the driver feeds into `transition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A fresh deployment: precache the manifest into `version`.
    InstallRequested { version: String },
    /// Restart with `version` already precached and ready.
    InstallSkipped { version: String },
    /// Every manifest target was fetched and stored.
    InstallSucceeded,
    /// At least one manifest target failed; the install is dead.
    InstallFailed { reason: String },
    /// Activation may begin; `existing` is every stored generation name.
    ActivateRequested { existing: Vec<String> },
    /// The current generation has been promoted.
    ActivateCompleted,
    /// A failed deployment falls back to a previously-ready generation.
    FallbackRequested { generation: String },
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::InstallRequested { .. } => "install_requested",
            Event::InstallSkipped { .. } => "install_skipped",
            Event::InstallSucceeded => "install_succeeded",
            Event::InstallFailed { .. } => "install_failed",
            Event::ActivateRequested { .. } => "activate_requested",
            Event::ActivateCompleted => "activate_completed",
            Event::FallbackRequested { .. } => "fallback_requested",
        }
    }
}

/// Side effects a transition asks the driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Create-if-absent the named generation.
    OpenGeneration { name: String },
    /// Fetch every manifest target and store the results atomically.
    PrecacheManifest { generation: String },
    /// Flip the generation's ready flag; only ready generations activate.
    MarkReady { generation: String },
    /// Skip the waiting phase: proceed straight to activation.
    BeginActivation,
    /// Delete one stale generation; best-effort, independent per name.
    DeleteGeneration { name: String },
    /// Point the shared current-generation handle at `name` so every
    /// subsequent intercepted fetch is served by it immediately.
    PromoteGeneration { name: String },
    /// Surface a dead install to the operator.
    ReportInstallFailure { generation: String, reason: String },
}

/// Apply one event to the current state.
///
/// Returns the successor state and the effects the driver must run, or
/// `Error::InvalidTransition` if the event is not legal in this state.
pub fn transition(state: &LifecycleState, event: Event) -> Result<(LifecycleState, Vec<Effect>), Error> {
    match (state, event) {
        (LifecycleState::Uninstalled, Event::InstallRequested { version }) => Ok((
            LifecycleState::Installing { version: version.clone() },
            vec![
                Effect::OpenGeneration { name: version.clone() },
                Effect::PrecacheManifest { generation: version },
            ],
        )),

        (LifecycleState::Uninstalled, Event::InstallSkipped { version }) => {
            Ok((LifecycleState::Installed { version }, vec![Effect::BeginActivation]))
        }

        (LifecycleState::Installing { version }, Event::InstallSucceeded) => Ok((
            LifecycleState::Installed { version: version.clone() },
            vec![Effect::MarkReady { generation: version.clone() }, Effect::BeginActivation],
        )),

        (LifecycleState::Installing { version }, Event::InstallFailed { reason }) => Ok((
            LifecycleState::Failed { version: version.clone() },
            vec![Effect::ReportInstallFailure { generation: version.clone(), reason }],
        )),

        (LifecycleState::Installed { version }, Event::ActivateRequested { existing }) => {
            let mut effects: Vec<Effect> = existing
                .into_iter()
                .filter(|name| name != version)
                .map(|name| Effect::DeleteGeneration { name })
                .collect();
            effects.push(Effect::PromoteGeneration { name: version.clone() });

            Ok((LifecycleState::Activating { version: version.clone() }, effects))
        }

        (LifecycleState::Activating { version }, Event::ActivateCompleted) => {
            Ok((LifecycleState::Active { version: version.clone() }, Vec::new()))
        }

        // Fallback is an activation without purges: the previously-ready
        // generation is promoted, nothing else is touched.
        (LifecycleState::Failed { .. }, Event::FallbackRequested { generation }) => Ok((
            LifecycleState::Activating { version: generation.clone() },
            vec![Effect::PromoteGeneration { name: generation }],
        )),

        (state, event) => Err(Error::InvalidTransition {
            state: state.as_str().to_string(),
            event: event.as_str().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(version: &str) -> Event {
        Event::InstallRequested { version: version.to_string() }
    }

    #[test]
    fn test_install_opens_and_precaches() {
        let (state, effects) = transition(&LifecycleState::Uninstalled, install("v1")).unwrap();

        assert_eq!(state, LifecycleState::Installing { version: "v1".into() });
        assert_eq!(
            effects,
            vec![
                Effect::OpenGeneration { name: "v1".into() },
                Effect::PrecacheManifest { generation: "v1".into() },
            ]
        );
    }

    #[test]
    fn test_install_success_marks_ready_and_skips_waiting() {
        let state = LifecycleState::Installing { version: "v1".into() };
        let (state, effects) = transition(&state, Event::InstallSucceeded).unwrap();

        assert_eq!(state, LifecycleState::Installed { version: "v1".into() });
        assert_eq!(effects, vec![Effect::MarkReady { generation: "v1".into() }, Effect::BeginActivation]);
    }

    #[test]
    fn test_install_failure_is_terminal_and_reported() {
        let state = LifecycleState::Installing { version: "v2".into() };
        let (state, effects) = transition(&state, Event::InstallFailed { reason: "status 404".into() }).unwrap();

        assert_eq!(state, LifecycleState::Failed { version: "v2".into() });
        assert_eq!(
            effects,
            vec![Effect::ReportInstallFailure { generation: "v2".into(), reason: "status 404".into() }]
        );
    }

    #[test]
    fn test_activate_purges_every_stale_generation() {
        let state = LifecycleState::Installed { version: "v2".into() };
        let existing = vec!["v1".to_string(), "v2".to_string(), "v0".to_string()];
        let (state, effects) = transition(&state, Event::ActivateRequested { existing }).unwrap();

        assert_eq!(state, LifecycleState::Activating { version: "v2".into() });
        assert_eq!(
            effects,
            vec![
                Effect::DeleteGeneration { name: "v1".into() },
                Effect::DeleteGeneration { name: "v0".into() },
                Effect::PromoteGeneration { name: "v2".into() },
            ]
        );
    }

    #[test]
    fn test_activate_completed_reaches_active() {
        let state = LifecycleState::Activating { version: "v2".into() };
        let (state, effects) = transition(&state, Event::ActivateCompleted).unwrap();

        assert!(state.is_active());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_skipped_install_still_activates() {
        let (state, effects) =
            transition(&LifecycleState::Uninstalled, Event::InstallSkipped { version: "v1".into() }).unwrap();

        assert_eq!(state, LifecycleState::Installed { version: "v1".into() });
        assert_eq!(effects, vec![Effect::BeginActivation]);
    }

    #[test]
    fn test_fallback_promotes_without_purging() {
        let state = LifecycleState::Failed { version: "v3".into() };
        let (state, effects) = transition(&state, Event::FallbackRequested { generation: "v2".into() }).unwrap();

        assert_eq!(state, LifecycleState::Activating { version: "v2".into() });
        assert_eq!(effects, vec![Effect::PromoteGeneration { name: "v2".into() }]);
    }

    #[test]
    fn test_out_of_order_events_are_rejected() {
        let active = LifecycleState::Active { version: "v1".into() };
        assert!(matches!(
            transition(&active, install("v2")),
            Err(Error::InvalidTransition { .. })
        ));

        assert!(matches!(
            transition(&LifecycleState::Uninstalled, Event::ActivateCompleted),
            Err(Error::InvalidTransition { .. })
        ));

        let failed = LifecycleState::Failed { version: "v1".into() };
        assert!(matches!(
            transition(&failed, Event::InstallSucceeded),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_full_deploy_sequence() {
        let (state, _) = transition(&LifecycleState::Uninstalled, install("v1")).unwrap();
        let (state, _) = transition(&state, Event::InstallSucceeded).unwrap();
        let (state, _) =
            transition(&state, Event::ActivateRequested { existing: vec!["v1".into()] }).unwrap();
        let (state, _) = transition(&state, Event::ActivateCompleted).unwrap();

        assert_eq!(state, LifecycleState::Active { version: "v1".into() });
    }
}
