use crate::{AppError, Settings};
use kintree_core::{LayoutMode, Member, MemberId, Story, stories_involving};
use kintree_events::telemetry::{BuildStats, Operation, Span};
use kintree_events::{Event, EventBus, EventListener};
use kintree_graph::{
    DepthTable, EdgeStyle, FamilyGraph, ForceSimulation, HierarchicalLayout, LayoutError,
    LayoutOutput, LinkView, NodeColors, NodeView, RelationQuery, RelationSet, Vec2, Viewport,
    get_link_style, get_node_colors,
};
use kintree_store::MemberStore;

/// What the adapter shows instead of (or on top of) the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    NoMembers,
    /// The last recompute failed; the previous picture is still returned.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub nodes: Vec<NodeView>,
    /// Fill/border/text per node, parallel to `nodes`.
    pub colors: Vec<NodeColors>,
    pub links: Vec<LinkView>,
    pub link_style: EdgeStyle,
    pub mode: LayoutMode,
    pub placeholder: Option<Placeholder>,
}

/// Permission to advance the force simulation by one frame. Only valid for
/// the simulation epoch it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    epoch: u64,
}

impl FrameTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

enum LayoutState {
    Hierarchical(HierarchicalLayout),
    Force {
        simulation: ForceSimulation,
        /// Set after a diverged frame; cleared by the next resize, drag or rebuild.
        halted: bool,
    },
}

fn build_layout(
    mode: LayoutMode,
    settings: &Settings,
    graph: &FamilyGraph,
    depths: &DepthTable,
    viewport: Viewport,
    previous: &LayoutOutput,
) -> Result<(LayoutState, LayoutOutput), LayoutError> {
    let (state, output) = match mode {
        LayoutMode::Hierarchical => {
            let layout =
                HierarchicalLayout::new(graph, depths, settings.hierarchical_settings(), viewport);
            let output = layout.output(graph);
            (LayoutState::Hierarchical(layout), output)
        }
        LayoutMode::Force => {
            let simulation =
                ForceSimulation::seeded(graph, settings.force_settings(), viewport, previous);
            let output = simulation.output(graph);
            (
                LayoutState::Force {
                    simulation,
                    halted: false,
                },
                output,
            )
        }
    };

    if let Some(node) = output
        .nodes
        .iter()
        .find(|node| !node.position.point().is_finite())
    {
        return Err(LayoutError::Diverged {
            member: node.id.clone(),
            ticks: 0,
        });
    }
    Ok((state, output))
}

/// Headless owner of one tree view: graph, depths, layout state and the
/// last good picture.
///
/// Inbound events arrive through [`EventListener`]; `RelationsReady` and
/// `ShowError` go out on the `outbox` bus handed to [`TreeViewController::new`].
pub struct TreeViewController {
    settings: Settings,
    outbox: EventBus,
    mode: LayoutMode,
    viewport: Viewport,
    graph: FamilyGraph,
    depths: DepthTable,
    layout: LayoutState,
    output: LayoutOutput,
    epoch: u64,
    build_stats: BuildStats,
    stories: Vec<Story>,
    selection: Option<RelationSet>,
    selected_stories: Vec<Story>,
    error: Option<String>,
    store_revision: Option<u64>,
}

impl TreeViewController {
    pub fn new(settings: Settings, outbox: EventBus) -> Self {
        let mode = settings.layout_mode;
        let viewport = Viewport::new(0.0, 0.0).sanitized(settings.min_width, settings.min_height);
        let graph = FamilyGraph::new();
        let depths = DepthTable::compute(&graph);
        let layout = match mode {
            LayoutMode::Hierarchical => LayoutState::Hierarchical(HierarchicalLayout::new(
                &graph,
                &depths,
                settings.hierarchical_settings(),
                viewport,
            )),
            LayoutMode::Force => LayoutState::Force {
                simulation: ForceSimulation::new(&graph, settings.force_settings(), viewport),
                halted: false,
            },
        };

        Self {
            settings,
            outbox,
            mode,
            viewport,
            graph,
            depths,
            layout,
            output: LayoutOutput::default(),
            epoch: 0,
            build_stats: BuildStats::default(),
            stories: Vec::new(),
            selection: None,
            selected_stories: Vec::new(),
            error: None,
            store_revision: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn graph(&self) -> &FamilyGraph {
        &self.graph
    }

    pub fn depths(&self) -> &DepthTable {
        &self.depths
    }

    /// Counts from the last successful rebuild.
    pub fn build_stats(&self) -> BuildStats {
        self.build_stats
    }

    pub fn selection(&self) -> Option<&RelationSet> {
        self.selection.as_ref()
    }

    /// Stories tagged with the selected member.
    pub fn selected_stories(&self) -> &[Story] {
        &self.selected_stories
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.selected_stories.clear();
    }

    pub fn scene(&self) -> Scene {
        let placeholder = match &self.error {
            Some(message) => Some(Placeholder::Error(message.clone())),
            None if self.graph.is_empty() => Some(Placeholder::NoMembers),
            None => None,
        };
        Scene {
            nodes: self.output.nodes.clone(),
            colors: self
                .output
                .nodes
                .iter()
                .map(|node| get_node_colors(node.category))
                .collect(),
            links: self.output.links.clone(),
            link_style: get_link_style(self.mode),
            mode: self.mode,
            placeholder,
        }
    }

    fn fail(&mut self, span: Span, err: AppError, sticky: bool) -> AppError {
        let message = err.to_string();
        span.fail(&message);
        if sticky {
            self.error = Some(message.clone());
        }
        self.outbox.publish(Event::ShowError { message });
        err
    }

    /// Rebuilds graph, depths and layout from a new member snapshot. The
    /// current picture is only replaced when the new one is complete.
    pub fn members_changed(&mut self, members: &[Member]) -> Result<(), AppError> {
        let span = Span::start(Operation::MembersChanged);

        let graph = FamilyGraph::build(members);
        let depths = DepthTable::compute(&graph);
        let stats = BuildStats::collect(&graph, &depths);
        span.record_build(&stats);

        match build_layout(
            self.mode,
            &self.settings,
            &graph,
            &depths,
            self.viewport,
            &self.output,
        ) {
            Ok((layout, output)) => {
                self.graph = graph;
                self.depths = depths;
                self.build_stats = stats;
                self.layout = layout;
                self.output = output;
                self.epoch += 1;
                self.error = None;
                self.refresh_selection();
                span.finish();
                Ok(())
            }
            Err(err) => Err(self.fail(span, err.into(), true)),
        }
    }

    /// Replaces the story list and re-resolves the selected member's stories.
    pub fn stories_changed(&mut self, stories: &[Story]) {
        let span = Span::start(Operation::StoriesChanged);
        self.stories = stories.to_vec();
        self.refresh_selection();
        span.finish();
    }

    /// Rebuilds from the store when its revision moved. Returns whether it did.
    pub fn sync_store(&mut self, store: &MemberStore) -> Result<bool, AppError> {
        if self.store_revision == Some(store.revision()) {
            return Ok(false);
        }
        self.stories = store.stories().to_vec();
        self.members_changed(&store.snapshot())?;
        self.store_revision = Some(store.revision());
        Ok(true)
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) -> Result<(), AppError> {
        let span = Span::start(Operation::SetLayoutMode);

        match build_layout(
            mode,
            &self.settings,
            &self.graph,
            &self.depths,
            self.viewport,
            &self.output,
        ) {
            Ok((layout, output)) => {
                self.mode = mode;
                self.layout = layout;
                self.output = output;
                self.epoch += 1;
                self.error = None;
                span.finish();
                Ok(())
            }
            Err(err) => Err(self.fail(span, err.into(), true)),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let span = Span::start(Operation::Resize);

        self.viewport = Viewport::new(width, height)
            .sanitized(self.settings.min_width, self.settings.min_height);
        self.epoch += 1;
        match &mut self.layout {
            LayoutState::Hierarchical(layout) => {
                layout.resize(&self.depths, self.viewport);
                self.output = layout.output(&self.graph);
            }
            LayoutState::Force { simulation, halted } => {
                simulation.set_viewport(self.viewport);
                *halted = false;
            }
        }
        span.finish();
    }

    /// Resolves the member's relations and tagged stories and publishes both
    /// as one `RelationsReady`.
    pub fn select_member(&mut self, id: &MemberId) -> Result<&RelationSet, AppError> {
        let span = Span::start(Operation::SelectMember);

        let found = RelationQuery::new(&self.graph, &self.depths).relations(id);
        match found {
            Some(relations) => {
                self.selected_stories = self.stories_for(id);
                self.outbox.publish(Event::RelationsReady {
                    relations: Box::new(relations.clone()),
                    stories: self.selected_stories.clone(),
                });
                span.finish();
                Ok(self.selection.insert(relations))
            }
            None => Err(self.fail(span, AppError::UnknownMember(id.clone()), false)),
        }
    }

    fn stories_for(&self, id: &MemberId) -> Vec<Story> {
        stories_involving(&self.stories, id)
            .into_iter()
            .cloned()
            .collect()
    }

    fn refresh_selection(&mut self) {
        if let Some(current) = self.selection.take() {
            self.selection =
                RelationQuery::new(&self.graph, &self.depths).relations(&current.member.id);
            self.selected_stories = match &self.selection {
                Some(_) => self.stories_for(&current.member.id),
                None => {
                    tracing::debug!("Selected member {} left the tree", current.member.id);
                    Vec::new()
                }
            };
        }
    }

    fn drag_failed(&mut self, err: LayoutError) -> AppError {
        let err = AppError::from(err);
        self.outbox.publish(Event::ShowError {
            message: err.to_string(),
        });
        err
    }

    /// Copies one node's current position into the picture, plus the links
    /// that were re-routed for it.
    fn patch_output(&mut self, id: &MemberId, links: Vec<LinkView>) {
        let LayoutState::Hierarchical(layout) = &self.layout else {
            return;
        };
        let Some(position) = self.graph.index_of(id).and_then(|idx| layout.position(idx)) else {
            return;
        };
        if let Some(node) = self.output.nodes.iter_mut().find(|node| &node.id == id) {
            node.position = position;
        }
        for link in links {
            if let Some(existing) = self
                .output
                .links
                .iter_mut()
                .find(|l| l.source == link.source && l.target == link.target)
            {
                *existing = link;
            }
        }
    }

    pub fn drag_start(&mut self, id: &MemberId, x: f32, y: f32) -> Result<(), AppError> {
        let result = match &mut self.layout {
            LayoutState::Hierarchical(layout) => layout.drag_start(&self.graph, id),
            LayoutState::Force { simulation, halted } => {
                *halted = false;
                let result = simulation.drag_start(&self.graph, id, Vec2::new(x, y));
                if result.is_ok() {
                    self.output = simulation.output(&self.graph);
                }
                result
            }
        };
        result.map_err(|err| self.drag_failed(err))?;
        self.patch_output(id, Vec::new());
        Ok(())
    }

    pub fn drag_move(&mut self, id: &MemberId, x: f32, y: f32) -> Result<(), AppError> {
        let result = match &mut self.layout {
            LayoutState::Hierarchical(layout) => layout.drag_move(&self.graph, id, x),
            LayoutState::Force { simulation, .. } => simulation
                .drag_move(&self.graph, id, Vec2::new(x, y))
                .map(|()| Vec::new()),
        };
        let links = result.map_err(|err| self.drag_failed(err))?;
        self.patch_output(id, links);
        Ok(())
    }

    pub fn drag_end(&mut self, id: &MemberId) -> Result<(), AppError> {
        let result = match &mut self.layout {
            LayoutState::Hierarchical(layout) => layout.drag_end(&self.graph, id),
            LayoutState::Force { simulation, .. } => {
                let result = simulation.drag_end(&self.graph, id);
                if result.is_ok() {
                    self.output = simulation.output(&self.graph);
                }
                result
            }
        };
        result.map_err(|err| self.drag_failed(err))?;
        self.patch_output(id, Vec::new());
        Ok(())
    }

    /// A ticket when the force simulation still has work to do.
    pub fn request_frame(&self) -> Option<FrameTicket> {
        match &self.layout {
            LayoutState::Force { simulation, halted } if !*halted && !simulation.settled() => {
                Some(FrameTicket { epoch: self.epoch })
            }
            _ => None,
        }
    }

    /// Runs up to `ticks_per_frame` ticks. `None` when the ticket is stale or
    /// there is nothing to advance; otherwise the number of ticks run.
    pub fn advance_frame(&mut self, ticket: FrameTicket) -> Option<Result<usize, AppError>> {
        if ticket.epoch != self.epoch {
            tracing::debug!(
                "Discarding frame ticket from epoch {} (current {})",
                ticket.epoch,
                self.epoch
            );
            return None;
        }
        let LayoutState::Force { simulation, halted } = &mut self.layout else {
            return None;
        };
        if *halted {
            return None;
        }

        match simulation.step(self.settings.ticks_per_frame.max(1)) {
            Ok(ran) => {
                self.output = simulation.output(&self.graph);
                Some(Ok(ran))
            }
            Err(err) => {
                *simulation = ForceSimulation::seeded(
                    &self.graph,
                    self.settings.force_settings(),
                    self.viewport,
                    &self.output,
                );
                *halted = true;
                let span = Span::start(Operation::AdvanceFrame);
                Some(Err(self.fail(span, err.into(), true)))
            }
        }
    }
}

impl EventListener for TreeViewController {
    fn handle_event(&mut self, event: &Event) {
        let result = match event {
            Event::MemberSelected { id } => self.select_member(id).map(|_| ()),
            Event::NodeDragStarted { id, x, y } => self.drag_start(id, *x, *y),
            Event::NodeDragMoved { id, x, y } => self.drag_move(id, *x, *y),
            Event::NodeDragEnded { id } => self.drag_end(id),
            Event::ViewportResized { width, height } => {
                self.resize(*width, *height);
                Ok(())
            }
            Event::MembersChanged { members } => self.members_changed(members),
            Event::SetLayoutMode(mode) => self.set_layout_mode(*mode),
            Event::StoriesChanged { stories } => {
                self.stories_changed(stories);
                Ok(())
            }
            Event::RelationsReady { .. } | Event::ShowError { .. } => Ok(()),
        };
        if let Err(err) = result {
            tracing::debug!("Event not applied: {}", err);
        }
    }
}
