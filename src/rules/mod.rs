//! Structural rule checks over the project graph.
//!
//! Every rule is an independent pure function of a validated [`Graph`]. The
//! stateless entry point is [`check_rule_violations`]; [`RuleChecker`] adds
//! the accept workflow on top: acceptance is keyed by [`ViolationKey`]
//! (rule, sorted targets, layer), survives reruns and is dropped once any
//! target disappears from the graph.

mod connectivity;
mod overlap;

use crate::model::{Graph, LayerId, ObjectRef};
use crate::trace::{trace_event, trace_span};
use crate::util::ChipMatchResult;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    OpenPort,
    UnconnectedVia,
    UnconnectedWire,
    OverlappingGates,
    OverlappingVias,
    MultipleDrivers,
    UndrivenNet,
}

impl RuleId {
    pub const ALL: [RuleId; 7] = [
        RuleId::OpenPort,
        RuleId::UnconnectedVia,
        RuleId::UnconnectedWire,
        RuleId::OverlappingGates,
        RuleId::OverlappingVias,
        RuleId::MultipleDrivers,
        RuleId::UndrivenNet,
    ];

    /// Stable kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            RuleId::OpenPort => "open-port",
            RuleId::UnconnectedVia => "unconnected-via",
            RuleId::UnconnectedWire => "unconnected-wire",
            RuleId::OverlappingGates => "overlapping-gates",
            RuleId::OverlappingVias => "overlapping-vias",
            RuleId::MultipleDrivers => "multiple-drivers",
            RuleId::UndrivenNet => "undriven-net",
        }
    }

    pub fn class(self) -> RuleClass {
        match self {
            RuleId::OpenPort | RuleId::UnconnectedVia | RuleId::UnconnectedWire => {
                RuleClass::Connectivity
            }
            RuleId::OverlappingGates | RuleId::OverlappingVias => RuleClass::Geometry,
            RuleId::MultipleDrivers | RuleId::UndrivenNet => RuleClass::Drive,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            RuleId::OpenPort | RuleId::OverlappingGates | RuleId::MultipleDrivers => Severity::Error,
            RuleId::UnconnectedVia
            | RuleId::UnconnectedWire
            | RuleId::OverlappingVias
            | RuleId::UndrivenNet => Severity::Warning,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleClass {
    /// Objects that should be wired up but are not.
    Connectivity,
    /// Objects that collide on a layer.
    Geometry,
    /// Signal driver problems inside a net.
    Drive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// Stable identity of a violation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViolationKey {
    pub rule: RuleId,
    /// Sorted and deduplicated.
    pub targets: Vec<ObjectRef>,
    /// Layer of the targets, `None` if they span layers.
    pub layer: Option<LayerId>,
}

impl ViolationKey {
    pub fn new(rule: RuleId, mut targets: Vec<ObjectRef>, layer: Option<LayerId>) -> Self {
        targets.sort_unstable();
        targets.dedup();
        Self {
            rule,
            targets,
            layer,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViolationStatus {
    #[default]
    Pending,
    Accepted,
}

/// One finding of a rule.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleViolation {
    pub key: ViolationKey,
    pub class: RuleClass,
    pub severity: Severity,
    pub description: String,
    pub status: ViolationStatus,
}

impl RuleViolation {
    pub(crate) fn new(key: ViolationKey, description: String) -> Self {
        Self {
            class: key.rule.class(),
            severity: key.rule.severity(),
            key,
            description,
            status: ViolationStatus::Pending,
        }
    }

    pub fn rule(&self) -> RuleId {
        self.key.rule
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ViolationStatus::Accepted
    }
}

/// Members of every net, indexed by member.
pub(crate) struct NetIndex<'a> {
    by_member: BTreeMap<ObjectRef, &'a crate::model::Net>,
}

impl<'a> NetIndex<'a> {
    pub(crate) fn new(graph: &'a Graph) -> Self {
        let mut by_member = BTreeMap::new();
        for net in graph.nets() {
            for member in &net.members {
                by_member.insert(*member, net);
            }
        }
        Self { by_member }
    }

    /// True if `member` shares a net with at least one other object.
    pub(crate) fn is_connected(&self, member: &ObjectRef) -> bool {
        self.by_member.get(member).is_some_and(|net| net.len() > 1)
    }
}

/// Evaluates every rule on `graph`.
///
/// Fails with `MalformedGraph` without reporting anything if the graph does
/// not validate. Violations are sorted by key; all are `Pending`.
pub fn check_rule_violations(graph: &Graph) -> ChipMatchResult<Vec<RuleViolation>> {
    let _span = trace_span!("rule_check", gates = graph.gates().count()).entered();
    graph.validate()?;

    let nets = NetIndex::new(graph);
    let mut out = Vec::new();
    out.extend(connectivity::open_ports(graph, &nets));
    out.extend(connectivity::unconnected_vias(graph, &nets));
    out.extend(connectivity::unconnected_wires(graph, &nets));
    out.extend(overlap::overlapping_gates(graph));
    out.extend(overlap::overlapping_vias(graph));
    out.extend(connectivity::multiple_drivers(graph));
    out.extend(connectivity::undriven_nets(graph));
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out.dedup_by(|a, b| a.key == b.key);

    trace_event!("rule_violations", count = out.len());
    Ok(out)
}

/// Result of a [`RuleChecker`] run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckReport {
    pub violations: Vec<RuleViolation>,
    /// Pending violations that the previous run did not report.
    pub new_pending: Vec<ViolationKey>,
}

impl CheckReport {
    pub fn pending(&self) -> impl Iterator<Item = &RuleViolation> + '_ {
        self.violations.iter().filter(|v| !v.is_accepted())
    }

    pub fn accepted(&self) -> impl Iterator<Item = &RuleViolation> + '_ {
        self.violations.iter().filter(|v| v.is_accepted())
    }
}

/// Rule checking with persistent acceptance state.
#[derive(Clone, Debug, Default)]
pub struct RuleChecker {
    accepted: BTreeSet<ViolationKey>,
    previous: BTreeSet<ViolationKey>,
}

impl RuleChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `graph`, applies acceptance and diffs against the last run.
    pub fn run(&mut self, graph: &Graph) -> ChipMatchResult<CheckReport> {
        let mut violations = check_rule_violations(graph)?;

        let before = self.accepted.len();
        self.accepted
            .retain(|key| key.targets.iter().all(|target| graph.contains(target)));
        if self.accepted.len() != before {
            trace_event!("acceptance_pruned", count = before - self.accepted.len());
        }

        let mut new_pending = Vec::new();
        for violation in &mut violations {
            if self.accepted.contains(&violation.key) {
                violation.status = ViolationStatus::Accepted;
            } else if !self.previous.contains(&violation.key) {
                new_pending.push(violation.key.clone());
            }
        }
        self.previous = violations.iter().map(|v| v.key.clone()).collect();

        Ok(CheckReport {
            violations,
            new_pending,
        })
    }

    /// Marks `key` accepted. Returns false if it already was.
    pub fn accept(&mut self, key: ViolationKey) -> bool {
        self.accepted.insert(key)
    }

    /// Returns `key` to pending. Returns false if it was not accepted.
    pub fn unaccept(&mut self, key: &ViolationKey) -> bool {
        self.accepted.remove(key)
    }

    pub fn is_accepted(&self, key: &ViolationKey) -> bool {
        self.accepted.contains(key)
    }

    pub fn accepted(&self) -> impl Iterator<Item = &ViolationKey> + '_ {
        self.accepted.iter()
    }
}
