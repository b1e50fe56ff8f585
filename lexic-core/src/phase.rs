/// Defines session phases and their behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_welcome(&self) -> bool {
        false
    }
    fn is_instructions(&self) -> bool {
        false
    }
    fn is_lead_in(&self) -> bool {
        false
    }
    fn is_trials(&self) -> bool {
        false
    }
    fn is_results(&self) -> bool {
        false
    }
    fn is_farewell(&self) -> bool {
        false
    }
    fn is_rating(&self) -> bool {
        false
    }
}

/// The fixed phase order of a lexical decision session.
#[derive(Copy, Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Welcome,
    Instructions,
    LeadIn,
    Trials,
    Results,
    Farewell,
    Rating,
}

impl Phase for SessionPhase {
    fn allows_input(&self) -> bool {
        matches!(self, Self::Instructions | Self::Trials | Self::Rating)
    }

    fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => Instructions,
            Instructions => LeadIn,
            LeadIn => Trials,
            Trials => Results,
            Results => Farewell,
            Farewell => Rating,
            Rating => return None,
        })
    }

    fn is_welcome(&self) -> bool {
        matches!(self, SessionPhase::Welcome)
    }

    fn is_instructions(&self) -> bool {
        matches!(self, SessionPhase::Instructions)
    }

    fn is_lead_in(&self) -> bool {
        matches!(self, SessionPhase::LeadIn)
    }

    fn is_trials(&self) -> bool {
        matches!(self, SessionPhase::Trials)
    }

    fn is_results(&self) -> bool {
        matches!(self, SessionPhase::Results)
    }

    fn is_farewell(&self) -> bool {
        matches!(self, SessionPhase::Farewell)
    }

    fn is_rating(&self) -> bool {
        matches!(self, SessionPhase::Rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order_matches_session_flow() {
        let mut phase = SessionPhase::default();
        let expected = [
            SessionPhase::Instructions,
            SessionPhase::LeadIn,
            SessionPhase::Trials,
            SessionPhase::Results,
            SessionPhase::Farewell,
            SessionPhase::Rating,
        ];
        for want in expected {
            phase = phase.next().unwrap();
            assert_eq!(phase, want);
        }
        assert_eq!(phase.next(), None);
    }

    #[test]
    fn input_only_where_a_response_is_meaningful() {
        assert!(!SessionPhase::Welcome.allows_input());
        assert!(SessionPhase::Instructions.allows_input());
        assert!(!SessionPhase::LeadIn.allows_input());
        assert!(SessionPhase::Trials.allows_input());
        assert!(!SessionPhase::Results.allows_input());
        assert!(!SessionPhase::Farewell.allows_input());
        assert!(SessionPhase::Rating.allows_input());
    }
}
