use crate::error::SimError;
use std::fmt;
use std::str::FromStr;

/// How newly queued requests are mapped onto channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAlgorithm {
    /// Rotating cursor, skipping channels without room for the request
    CapacityAwareRoundRobin,
    /// Rotating cursor with no capacity check (stress baseline)
    NaiveRoundRobin,
    /// Longest request first onto the channel with the least accumulated latency
    GreedyLoadBalancing,
}

impl AssignmentAlgorithm {
    /// Short tag used in trace file names
    pub fn short_name(&self) -> &'static str {
        match self {
            AssignmentAlgorithm::CapacityAwareRoundRobin => "rr",
            AssignmentAlgorithm::NaiveRoundRobin => "rrn",
            AssignmentAlgorithm::GreedyLoadBalancing => "clb",
        }
    }
}

impl FromStr for AssignmentAlgorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rr" | "round_robin" | "capacity_aware_round_robin" => {
                Ok(AssignmentAlgorithm::CapacityAwareRoundRobin)
            }
            "rrn" | "naive_round_robin" => Ok(AssignmentAlgorithm::NaiveRoundRobin),
            "clb" | "load_balancing" | "greedy_load_balancing" => {
                Ok(AssignmentAlgorithm::GreedyLoadBalancing)
            }
            _ => Err(SimError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for AssignmentAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssignmentAlgorithm::CapacityAwareRoundRobin => "capacity-aware round robin",
            AssignmentAlgorithm::NaiveRoundRobin => "naive round robin",
            AssignmentAlgorithm::GreedyLoadBalancing => "greedy load balancing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "rr".parse::<AssignmentAlgorithm>().unwrap(),
            AssignmentAlgorithm::CapacityAwareRoundRobin
        );
        assert_eq!(
            "Naive_Round_Robin".parse::<AssignmentAlgorithm>().unwrap(),
            AssignmentAlgorithm::NaiveRoundRobin
        );
        assert_eq!(
            "clb".parse::<AssignmentAlgorithm>().unwrap(),
            AssignmentAlgorithm::GreedyLoadBalancing
        );
    }

    #[test]
    fn test_short_name_round_trips() {
        for alg in [
            AssignmentAlgorithm::CapacityAwareRoundRobin,
            AssignmentAlgorithm::NaiveRoundRobin,
            AssignmentAlgorithm::GreedyLoadBalancing,
        ] {
            assert_eq!(alg.short_name().parse::<AssignmentAlgorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = "fcfs".parse::<AssignmentAlgorithm>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
        assert_eq!(err, SimError::UnknownAlgorithm("fcfs".to_string()));
    }
}
