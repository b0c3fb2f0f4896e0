use super::{LayoutError, LayoutOutput, LayoutPosition, Layouter, Viewport};
use crate::depth::DepthTable;
use crate::edge_router::LinkPath;
use crate::graph::{FamilyGraph, Vec2};
use kintree_core::MemberId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceSettings {
    pub link_distance: f32,
    /// Negative values repel.
    pub charge_strength: f32,
    pub collide_radius: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub reheat_alpha: f32,
    /// Tick budget per (re)start.
    pub max_ticks: usize,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for ForceSettings {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 100.0,
            charge_strength: -500.0,
            collide_radius: 60.0,
            velocity_decay: 0.4,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            reheat_alpha: 0.3,
            max_ticks: 300,
            min_width: 320.0,
            min_height: 240.0,
        }
    }
}

const INITIAL_RADIUS: f32 = 10.0;
const DISTANCE_MIN2: f32 = 1.0;

fn straight(from: Vec2, to: Vec2) -> LinkPath {
    LinkPath::Straight { from, to }
}

/// Runs a fresh simulation to rest and returns the final picture.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceLayouter {
    pub settings: ForceSettings,
}

impl Layouter for ForceLayouter {
    fn execute(
        &self,
        graph: &FamilyGraph,
        _depths: &DepthTable,
        viewport: Viewport,
    ) -> Result<LayoutOutput, LayoutError> {
        let mut simulation = ForceSimulation::new(graph, self.settings, viewport);
        simulation.run_until_settled()?;
        tracing::debug!(
            "Force layout settled after {} ticks for {} members",
            simulation.ticks(),
            graph.len()
        );
        Ok(simulation.output(graph))
    }
}

/// Deterministic linear congruential source for the coincident-node jiggle.
#[derive(Debug, Clone)]
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (f64::from(self.0) / 4_294_967_296.0) as f32
    }

    fn jiggle(&mut self) -> f32 {
        (self.next() - 0.5) * 1e-6
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    strength: f32,
    /// Share of the correction applied to the target.
    bias: f32,
}

/// Incremental force-directed relaxation.
///
/// The host advances it one `tick` at a time (or drives it to rest with
/// `run_until_settled`). Node `i` of the simulation is `MemberIndex(i)` of
/// the graph it was built from.
#[derive(Debug, Clone)]
pub struct ForceSimulation {
    settings: ForceSettings,
    center: Vec2,
    ids: Vec<MemberId>,
    links: Vec<Link>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pins: Vec<Option<Vec2>>,
    alpha: f32,
    alpha_target: f32,
    ticks: usize,
    active_drags: usize,
    rng: Lcg,
}

impl ForceSimulation {
    pub fn new(graph: &FamilyGraph, settings: ForceSettings, viewport: Viewport) -> Self {
        Self::seeded(graph, settings, viewport, &LayoutOutput::default())
    }

    /// Builds a simulation whose surviving members start where `previous`
    /// left them; newcomers go on the spiral.
    pub fn seeded(
        graph: &FamilyGraph,
        settings: ForceSettings,
        viewport: Viewport,
        previous: &LayoutOutput,
    ) -> Self {
        let center = viewport
            .sanitized(settings.min_width, settings.min_height)
            .center();
        let carried: HashMap<&MemberId, Vec2> = previous
            .nodes
            .iter()
            .filter(|node| node.position.point().is_finite())
            .map(|node| (&node.id, node.position.point()))
            .collect();

        let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
        let mut ids = Vec::with_capacity(graph.len());
        let mut positions = Vec::with_capacity(graph.len());
        for idx in graph.indices() {
            let id = graph[idx].id.clone();
            let position = carried.get(&id).copied().unwrap_or_else(|| {
                let radius = INITIAL_RADIUS * (0.5 + idx.0 as f32).sqrt();
                let angle = idx.0 as f32 * golden_angle;
                center + Vec2::new(radius * angle.cos(), radius * angle.sin())
            });
            ids.push(id);
            positions.push(position);
        }

        let mut degree = vec![0usize; graph.len()];
        for (parent, child) in graph.edges() {
            degree[parent.0] += 1;
            degree[child.0] += 1;
        }
        let links = graph
            .edges()
            .map(|(parent, child)| {
                let (s, t) = (degree[parent.0], degree[child.0]);
                Link {
                    source: parent.0,
                    target: child.0,
                    strength: 1.0 / s.min(t) as f32,
                    bias: s as f32 / (s + t) as f32,
                }
            })
            .collect();

        Self {
            settings,
            center,
            ids,
            links,
            velocities: vec![Vec2::ZERO; positions.len()],
            pins: vec![None; positions.len()],
            positions,
            alpha: 1.0,
            alpha_target: 0.0,
            ticks: 0,
            active_drags: 0,
            rng: Lcg(1),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn is_dragging(&self) -> bool {
        self.active_drags > 0
    }

    pub fn settled(&self) -> bool {
        !self.is_dragging()
            && (self.alpha < self.settings.alpha_min || self.ticks >= self.settings.max_ticks)
    }

    /// Resets the tick budget.
    pub fn restart(&mut self) {
        self.ticks = 0;
    }

    pub fn tick(&mut self) -> Result<(), LayoutError> {
        self.alpha += (self.alpha_target - self.alpha) * self.settings.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collide();

        let keep = 1.0 - self.settings.velocity_decay;
        for i in 0..self.positions.len() {
            match self.pins[i] {
                Some(pin) => {
                    self.positions[i] = pin;
                    self.velocities[i] = Vec2::ZERO;
                }
                None => {
                    self.velocities[i] = self.velocities[i] * keep;
                    self.positions[i] = self.positions[i] + self.velocities[i];
                }
            }
        }
        self.ticks += 1;

        if let Some(i) = self.positions.iter().position(|p| !p.is_finite()) {
            tracing::error!(
                "Force simulation produced a non-finite position for {} at tick {}",
                self.ids[i],
                self.ticks
            );
            return Err(LayoutError::Diverged {
                member: self.ids[i].clone(),
                ticks: self.ticks,
            });
        }
        Ok(())
    }

    /// Runs up to `ticks` ticks, stopping early once settled. Returns how many ran.
    pub fn step(&mut self, ticks: usize) -> Result<usize, LayoutError> {
        let mut ran = 0;
        while ran < ticks && !self.settled() {
            self.tick()?;
            ran += 1;
        }
        Ok(ran)
    }

    pub fn run_until_settled(&mut self) -> Result<(), LayoutError> {
        while !self.settled() {
            self.tick()?;
        }
        Ok(())
    }

    fn apply_links(&mut self) {
        for k in 0..self.links.len() {
            let link = self.links[k];
            let source = self.positions[link.source] + self.velocities[link.source];
            let target = self.positions[link.target] + self.velocities[link.target];
            let mut d = target - source;
            if d.x == 0.0 {
                d.x = self.rng.jiggle();
            }
            if d.y == 0.0 {
                d.y = self.rng.jiggle();
            }
            let l = d.length();
            let scale = (l - self.settings.link_distance) / l * self.alpha * link.strength;
            let d = d * scale;
            self.velocities[link.target] = self.velocities[link.target] - d * link.bias;
            self.velocities[link.source] = self.velocities[link.source] + d * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.positions.len();
        for i in 0..n {
            let mut push = Vec2::ZERO;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut d = self.positions[j] - self.positions[i];
                if d.x == 0.0 {
                    d.x = self.rng.jiggle();
                }
                if d.y == 0.0 {
                    d.y = self.rng.jiggle();
                }
                let mut l = d.length_squared();
                if l < DISTANCE_MIN2 {
                    l = (DISTANCE_MIN2 * l).sqrt();
                }
                push = push + d * (self.settings.charge_strength * self.alpha / l);
            }
            self.velocities[i] = self.velocities[i] + push;
        }
    }

    fn apply_center(&mut self) {
        if self.positions.is_empty() {
            return;
        }
        let sum = self
            .positions
            .iter()
            .fold(Vec2::ZERO, |acc, &p| acc + p);
        let mean = sum * (1.0 / self.positions.len() as f32);
        let shift = mean - self.center;
        for p in &mut self.positions {
            *p = *p - shift;
        }
    }

    fn apply_collide(&mut self) {
        let r = self.settings.collide_radius * 2.0;
        let n = self.positions.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = self.positions[i] + self.velocities[i];
                let b = self.positions[j] + self.velocities[j];
                let mut d = a - b;
                let l = d.length_squared();
                if l >= r * r {
                    continue;
                }
                if d.x == 0.0 {
                    d.x = self.rng.jiggle();
                }
                if d.y == 0.0 {
                    d.y = self.rng.jiggle();
                }
                let l = d.length();
                let d = d * ((r - l) / l * 0.5);
                self.velocities[i] = self.velocities[i] + d;
                self.velocities[j] = self.velocities[j] - d;
            }
        }
    }

    fn slot(&self, graph: &FamilyGraph, id: &MemberId) -> Result<usize, LayoutError> {
        graph
            .index_of(id)
            .map(|idx| idx.0)
            .filter(|&i| i < self.positions.len())
            .ok_or_else(|| LayoutError::UnknownMember(id.clone()))
    }

    pub fn drag_start(
        &mut self,
        graph: &FamilyGraph,
        id: &MemberId,
        at: Vec2,
    ) -> Result<(), LayoutError> {
        let i = self.slot(graph, id)?;
        if self.active_drags == 0 {
            self.alpha_target = self.settings.reheat_alpha;
            self.restart();
        }
        if self.pins[i].is_none() {
            self.active_drags += 1;
        }
        self.pins[i] = Some(if at.is_finite() { at } else { self.positions[i] });
        Ok(())
    }

    pub fn drag_move(
        &mut self,
        graph: &FamilyGraph,
        id: &MemberId,
        to: Vec2,
    ) -> Result<(), LayoutError> {
        let i = self.slot(graph, id)?;
        if to.is_finite() {
            self.pins[i] = Some(to);
        }
        Ok(())
    }

    pub fn drag_end(&mut self, graph: &FamilyGraph, id: &MemberId) -> Result<(), LayoutError> {
        let i = self.slot(graph, id)?;
        if self.pins[i].take().is_some() {
            self.active_drags = self.active_drags.saturating_sub(1);
        }
        if self.active_drags == 0 {
            self.alpha_target = 0.0;
            self.restart();
        }
        Ok(())
    }

    /// Moves the centring target and reheats.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.center = viewport
            .sanitized(self.settings.min_width, self.settings.min_height)
            .center();
        self.alpha = self.alpha.max(self.settings.reheat_alpha);
        self.restart();
    }

    pub fn output(&self, graph: &FamilyGraph) -> LayoutOutput {
        let positions: Vec<LayoutPosition> = self
            .positions
            .iter()
            .zip(&self.pins)
            .map(|(p, pin)| LayoutPosition {
                x: p.x,
                y: p.y,
                pinned: pin.is_some(),
            })
            .collect();
        LayoutOutput::assemble(graph, &positions, straight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintree_core::Member;

    fn family() -> FamilyGraph {
        FamilyGraph::build(&[
            Member::named("1", "Marie", "Dupont"),
            Member::named("2", "Jean", "Dupont").with_parents(Some("1"), None),
            Member::named("3", "Sophie", "Martin").with_parents(Some("1"), None),
            Member::named("4", "Lucas", "Dupont").with_parents(Some("2"), None),
        ])
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn mean(positions: &[Vec2]) -> Vec2 {
        let sum = positions.iter().fold(Vec2::ZERO, |acc, &p| acc + p);
        sum * (1.0 / positions.len() as f32)
    }

    #[test]
    fn test_default_decay_reaches_alpha_min_in_300_ticks() {
        let settings = ForceSettings::default();
        let alpha = (1.0 - settings.alpha_decay).powi(300);
        assert!((alpha - settings.alpha_min).abs() < 1e-5);
    }

    #[test]
    fn test_force_layout_is_reproducible() {
        let graph = family();
        let depths = DepthTable::compute(&graph);
        let a = ForceLayouter::default().execute(&graph, &depths, viewport()).unwrap();
        let b = ForceLayouter::default().execute(&graph, &depths, viewport()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nodes.len(), 4);
        assert_eq!(a.links.len(), 3);
        assert!(a
            .links
            .iter()
            .all(|link| matches!(link.path, LinkPath::Straight { .. })));
    }

    #[test]
    fn test_settled_layout_is_centred_and_spread() {
        let graph = family();
        let mut sim = ForceSimulation::new(&graph, ForceSettings::default(), viewport());
        sim.run_until_settled().unwrap();
        assert!(sim.settled());
        assert!(sim.ticks() <= 300);

        let m = mean(sim.positions());
        assert!(m.distance(Vec2::new(400.0, 300.0)) < 1.0);
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(sim.positions()[i].distance(sim.positions()[j]) > 50.0);
            }
        }
    }

    #[test]
    fn test_empty_and_single_member() {
        let empty = FamilyGraph::build(&[]);
        let out = ForceLayouter::default()
            .execute(&empty, &DepthTable::compute(&empty), viewport())
            .unwrap();
        assert!(out.is_empty());

        let solo = FamilyGraph::build(&[Member::named("1", "Solo", "X")]);
        let out = ForceLayouter::default()
            .execute(&solo, &DepthTable::compute(&solo), viewport())
            .unwrap();
        let p = out.position_of(&MemberId::from("1")).unwrap();
        assert!((p.x - 400.0).abs() < 1e-3 && (p.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_drag_pins_and_keeps_simulation_warm() {
        let graph = family();
        let mut sim = ForceSimulation::new(&graph, ForceSettings::default(), viewport());
        sim.run_until_settled().unwrap();

        let jean = MemberId::from("2");
        let pin = Vec2::new(100.0, 100.0);
        sim.drag_start(&graph, &jean, pin).unwrap();
        assert_eq!(sim.alpha_target(), 0.3);
        assert!(!sim.settled());

        for _ in 0..400 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.positions()[1], pin);
        assert!(!sim.settled());
        assert!(sim.alpha() > 0.2);

        let moved = Vec2::new(120.0, 90.0);
        sim.drag_move(&graph, &jean, moved).unwrap();
        sim.tick().unwrap();
        assert_eq!(sim.positions()[1], moved);
        assert!(sim.output(&graph).nodes[1].position.pinned);

        sim.drag_end(&graph, &jean).unwrap();
        assert_eq!(sim.alpha_target(), 0.0);
        assert!(!sim.output(&graph).nodes[1].position.pinned);
        assert!(!sim.settled());

        let ran = sim.step(1000).unwrap();
        assert!(ran > 0);
        assert_ne!(sim.positions()[1], moved);

        assert_eq!(
            sim.drag_start(&graph, &MemberId::from("404"), pin),
            Err(LayoutError::UnknownMember(MemberId::from("404")))
        );
    }

    #[test]
    fn test_second_drag_does_not_restart_budget() {
        let graph = family();
        let mut sim = ForceSimulation::new(&graph, ForceSettings::default(), viewport());
        sim.drag_start(&graph, &MemberId::from("2"), Vec2::new(10.0, 10.0)).unwrap();
        sim.step(5).unwrap();
        sim.drag_start(&graph, &MemberId::from("3"), Vec2::new(20.0, 20.0)).unwrap();
        assert_eq!(sim.ticks(), 5);

        sim.drag_end(&graph, &MemberId::from("2")).unwrap();
        assert_eq!(sim.alpha_target(), 0.3);
        sim.drag_end(&graph, &MemberId::from("3")).unwrap();
        assert_eq!(sim.alpha_target(), 0.0);
    }

    #[test]
    fn test_resize_reheats_and_recentres() {
        let graph = family();
        let mut sim = ForceSimulation::new(&graph, ForceSettings::default(), viewport());
        sim.run_until_settled().unwrap();
        assert!(sim.alpha() < 0.3);

        sim.set_viewport(Viewport::new(1200.0, 600.0));
        assert!(sim.alpha() >= 0.3);
        assert_eq!(sim.ticks(), 0);
        assert_eq!(sim.center(), Vec2::new(600.0, 300.0));

        sim.run_until_settled().unwrap();
        assert!(mean(sim.positions()).distance(Vec2::new(600.0, 300.0)) < 1.0);
    }

    #[test]
    fn test_seeded_carries_previous_positions() {
        let graph = family();
        let mut sim = ForceSimulation::new(&graph, ForceSettings::default(), viewport());
        sim.run_until_settled().unwrap();
        let previous = sim.output(&graph);

        let grown = FamilyGraph::build(&[
            Member::named("1", "Marie", "Dupont"),
            Member::named("2", "Jean", "Dupont").with_parents(Some("1"), None),
            Member::named("5", "Emma", "Dupont").with_parents(Some("2"), None),
        ]);
        let seeded =
            ForceSimulation::seeded(&grown, ForceSettings::default(), viewport(), &previous);
        assert_eq!(seeded.positions()[0], previous.nodes[0].position.point());
        assert_eq!(seeded.positions()[1], previous.nodes[1].position.point());
        assert!(seeded.positions()[2].is_finite());
    }

    #[test]
    fn test_non_finite_forces_report_divergence() {
        let graph = FamilyGraph::build(&[
            Member::named("1", "A", "X"),
            Member::named("2", "B", "X"),
        ]);
        let settings = ForceSettings {
            charge_strength: f32::INFINITY,
            ..ForceSettings::default()
        };
        let mut sim = ForceSimulation::new(&graph, settings, viewport());
        let err = sim.tick().unwrap_err();
        assert!(matches!(err, LayoutError::Diverged { ticks: 1, .. }));
    }
}
