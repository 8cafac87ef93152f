#[cfg(test)]
mod tests {
    use lockplane::libs::plan::PhasePattern;
    use lockplane::libs::state::{PhaseState, STATE_FILE_NAME};
    use std::fs;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct StateContext {
        temp_dir: TempDir,
    }

    impl TestContext for StateContext {
        fn setup() -> Self {
            StateContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    fn sample() -> PhaseState {
        PhaseState::begin(
            "abc123".to_string(),
            "rename users.email -> users.email_address".to_string(),
            PhasePattern::ExpandContract,
        )
    }

    #[test]
    fn begin_starts_at_phase_one() {
        let state = sample();
        assert_eq!(state.current_phase, 1);
        assert!(state.completed_phases.is_empty());
        assert!(!state.is_complete(3));
    }

    #[test]
    fn completing_phases_advances_exactly_one_unit() {
        let mut state = sample();
        state.complete_phase(1);
        assert_eq!(state.current_phase, 2);
        assert_eq!(state.completed_phases, vec![1]);

        state.complete_phase(2);
        state.complete_phase(3);
        assert_eq!(state.completed_phases, vec![1, 2, 3]);
        assert!(state.is_complete(3));
    }

    #[test]
    fn completing_a_phase_twice_records_it_once() {
        let mut state = sample();
        state.complete_phase(1);
        state.complete_phase(1);
        assert_eq!(state.completed_phases, vec![1]);
    }

    #[test]
    fn retreat_undoes_the_previous_completion() {
        let mut state = sample();
        state.complete_phase(1);
        state.complete_phase(2);

        state.retreat_phase();
        assert_eq!(state.current_phase, 2);
        assert_eq!(state.completed_phases, vec![1]);

        state.retreat_phase();
        assert_eq!(state.current_phase, 1);
        assert!(state.completed_phases.is_empty());

        // Never retreats past the first phase.
        state.retreat_phase();
        assert_eq!(state.current_phase, 1);
    }

    #[test_context(StateContext)]
    #[test]
    fn save_and_load_round_trip(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        let mut state = sample();
        state.complete_phase(1);
        state.save(&path).unwrap();

        let loaded = PhaseState::load(&path).unwrap().expect("state file present");
        assert_eq!(loaded.plan_fingerprint, "abc123");
        assert_eq!(loaded.current_phase, 2);
        assert_eq!(loaded.completed_phases, vec![1]);
        assert_eq!(loaded.pattern, PhasePattern::ExpandContract);
    }

    #[test_context(StateContext)]
    #[test]
    fn load_returns_none_when_no_file_exists(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        assert!(PhaseState::load(&path).unwrap().is_none());
    }

    #[test_context(StateContext)]
    #[test]
    fn save_leaves_no_temp_file_behind(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        sample().save(&path).unwrap();

        let entries: Vec<String> = fs::read_dir(ctx.temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec![STATE_FILE_NAME.to_string()]);
    }

    #[test_context(StateContext)]
    #[test]
    fn save_overwrites_atomically(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        let mut state = sample();
        state.save(&path).unwrap();

        state.complete_phase(1);
        state.save(&path).unwrap();

        let loaded = PhaseState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.current_phase, 2);
    }

    #[test_context(StateContext)]
    #[test]
    fn corrupt_state_file_is_an_error_not_a_reset(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        fs::write(&path, "{not json").unwrap();
        assert!(PhaseState::load(&path).is_err());
    }

    #[test_context(StateContext)]
    #[test]
    fn remove_is_idempotent(ctx: &mut StateContext) {
        let path = ctx.temp_dir.path().join(STATE_FILE_NAME);
        sample().save(&path).unwrap();
        PhaseState::remove(&path).unwrap();
        PhaseState::remove(&path).unwrap();
        assert!(PhaseState::load(&path).unwrap().is_none());
    }
}
