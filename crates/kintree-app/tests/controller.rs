use kintree_app::{AppError, Placeholder, Settings, TreeViewController};
use kintree_core::{FamilyTree, LayoutMode, Member, MemberDraft, MemberId, Story, StoryDraft};
use kintree_events::{Event, EventBus};
use kintree_graph::{LayoutError, LinkPath};
use kintree_store::MemberStore;

fn family() -> Vec<Member> {
    vec![
        Member::named("1", "Marie", "Dupont"),
        Member::named("2", "Jean", "Dupont").with_parents(Some("1"), None),
        Member::named("3", "Sophie", "Martin").with_parents(Some("1"), None),
    ]
}

fn controller(mode: LayoutMode) -> (TreeViewController, EventBus) {
    let outbox = EventBus::new();
    let settings = Settings {
        layout_mode: mode,
        ..Settings::default()
    };
    (TreeViewController::new(settings, outbox.clone()), outbox)
}

fn id(value: &str) -> MemberId {
    MemberId::from(value)
}

#[test]
fn test_empty_tree_shows_placeholder() {
    let (ctrl, _) = controller(LayoutMode::Hierarchical);
    let scene = ctrl.scene();
    assert!(scene.nodes.is_empty());
    assert!(scene.links.is_empty());
    assert_eq!(scene.placeholder, Some(Placeholder::NoMembers));
    assert!(ctrl.request_frame().is_none());
}

#[test]
fn test_members_changed_builds_hierarchical_scene() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);
    ctrl.resize(900.0, 600.0);
    ctrl.members_changed(&family())?;

    let scene = ctrl.scene();
    assert_eq!(scene.placeholder, None);
    assert_eq!(scene.mode, LayoutMode::Hierarchical);
    assert_eq!(scene.nodes.len(), 3);
    assert_eq!(scene.links.len(), 2);
    assert_eq!(scene.colors.len(), 3);
    assert!(scene.link_style.curved);
    assert!((scene.nodes[0].position.x - 450.0).abs() < 0.01);
    assert!(ctrl.request_frame().is_none());

    ctrl.members_changed(&[])?;
    assert_eq!(ctrl.scene().placeholder, Some(Placeholder::NoMembers));
    Ok(())
}

#[test]
fn test_selection_publishes_relations() -> Result<(), AppError> {
    let (mut ctrl, outbox) = controller(LayoutMode::Hierarchical);
    ctrl.members_changed(&family())?;

    let relations = ctrl.select_member(&id("2"))?;
    assert_eq!(relations.siblings.len(), 1);
    assert_eq!(relations.siblings[0].id, id("3"));

    let events = outbox.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::RelationsReady { relations, stories }
            if relations.member.id == id("2") && stories.is_empty()
    ));

    let missing = ctrl.select_member(&id("404"));
    assert!(matches!(missing, Err(AppError::UnknownMember(_))));
    assert!(matches!(outbox.drain().as_slice(), [Event::ShowError { .. }]));
    assert_eq!(ctrl.scene().placeholder, None);
    assert_eq!(ctrl.selection().map(|r| r.member.id.clone()), Some(id("2")));

    // Removing the selected member clears the selection.
    ctrl.members_changed(&family()[..1])?;
    assert!(ctrl.selection().is_none());
    Ok(())
}

#[test]
fn test_selection_carries_tagged_stories() -> Result<(), AppError> {
    let (mut ctrl, outbox) = controller(LayoutMode::Hierarchical);
    ctrl.members_changed(&family())?;
    ctrl.stories_changed(&[
        Story::new("s1", "Le mariage", "Juin 1952").about(&["1", "2"]),
        Story::new("s2", "La ferme", "Été 1960").about(&["3"]),
        Story::new("s3", "Le départ", "1971").about(&["2", "404"]),
    ]);

    ctrl.select_member(&id("2"))?;
    let titles: Vec<&str> = ctrl
        .selected_stories()
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Le mariage", "Le départ"]);
    assert!(matches!(
        outbox.drain().as_slice(),
        [Event::RelationsReady { stories, .. }] if stories.len() == 2
    ));

    // A new story list re-resolves the current selection.
    ctrl.stories_changed(&[Story::new("s2", "La ferme", "Été 1960").about(&["3"])]);
    assert!(ctrl.selected_stories().is_empty());
    assert_eq!(ctrl.selection().map(|r| r.member.id.clone()), Some(id("2")));

    ctrl.clear_selection();
    assert!(ctrl.selection().is_none());
    Ok(())
}

#[test]
fn test_build_stats_follow_rebuilds() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);
    assert_eq!(ctrl.build_stats().members, 0);

    let mut members = family();
    members.push(Member::named("4", "Paul", "Roux").with_parents(Some("999"), None));
    ctrl.members_changed(&members)?;

    let stats = ctrl.build_stats();
    assert_eq!(stats.members, 4);
    assert_eq!(stats.edges, 2);
    assert_eq!(stats.roots, 2);
    assert_eq!(stats.generations, 2);
    assert_eq!(stats.graph_diagnostics, 1);
    assert_eq!(stats.cycle_edges, 0);
    Ok(())
}

#[test]
fn test_hierarchical_drag_updates_scene() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);
    ctrl.resize(900.0, 600.0);
    ctrl.members_changed(&family())?;

    ctrl.drag_start(&id("2"), 300.0, 180.0)?;
    ctrl.drag_move(&id("2"), 42.0, 999.0)?;
    let scene = ctrl.scene();
    let jean = &scene.nodes[1];
    assert!(jean.position.pinned);
    assert!((jean.position.x - 42.0).abs() < 0.01);
    assert!((jean.position.y - 180.0).abs() < 0.01);
    let link = scene
        .links
        .iter()
        .find(|l| l.target == id("2"))
        .ok_or(AppError::UnknownMember(id("2")))?;
    assert!(matches!(link.path, LinkPath::Curve(_)));
    assert!((link.path.end().x - 42.0).abs() < 0.01);

    ctrl.drag_end(&id("2"))?;
    assert!(!ctrl.scene().nodes[1].position.pinned);

    assert!(matches!(
        ctrl.drag_start(&id("404"), 0.0, 0.0),
        Err(AppError::Layout(LayoutError::UnknownMember(_)))
    ));
    Ok(())
}

#[test]
fn test_force_frames_and_stale_tickets() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Force);
    ctrl.resize(800.0, 600.0);
    ctrl.members_changed(&family())?;

    let ticket = ctrl.request_frame().expect("simulation should be running");
    let ran = ctrl.advance_frame(ticket).transpose()?;
    assert_eq!(ran, Some(1));

    // A resize invalidates outstanding tickets.
    let stale = ctrl.request_frame().expect("simulation should be running");
    ctrl.resize(1000.0, 600.0);
    assert!(ctrl.advance_frame(stale).is_none());

    // So does a members change.
    let stale = ctrl.request_frame().expect("simulation should be running");
    ctrl.members_changed(&family())?;
    assert!(ctrl.advance_frame(stale).is_none());

    let mut frames = 0;
    while let Some(ticket) = ctrl.request_frame() {
        ctrl.advance_frame(ticket).transpose()?;
        frames += 1;
        assert!(frames <= 300);
    }
    let scene = ctrl.scene();
    assert_eq!(scene.mode, LayoutMode::Force);
    assert!(!scene.link_style.curved);
    assert!(scene
        .links
        .iter()
        .all(|l| matches!(l.path, LinkPath::Straight { .. })));
    assert!(scene
        .nodes
        .iter()
        .all(|n| n.position.x.is_finite() && n.position.y.is_finite()));
    Ok(())
}

#[test]
fn test_released_node_resettles_after_long_drag() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Force);
    ctrl.resize(800.0, 600.0);
    ctrl.members_changed(&family())?;
    while let Some(ticket) = ctrl.request_frame() {
        ctrl.advance_frame(ticket).transpose()?;
    }

    ctrl.drag_start(&id("2"), 50.0, 50.0)?;
    for _ in 0..400 {
        let ticket = ctrl.request_frame().expect("a drag keeps the simulation running");
        ctrl.advance_frame(ticket).transpose()?;
    }
    ctrl.drag_end(&id("2"))?;

    let mut frames = 0;
    while let Some(ticket) = ctrl.request_frame() {
        ctrl.advance_frame(ticket).transpose()?;
        frames += 1;
        assert!(frames <= 300);
    }
    assert!(frames > 0);
    let jean = &ctrl.scene().nodes[1];
    assert!(!jean.position.pinned);
    assert!((jean.position.x - 50.0).abs() > 0.01 || (jean.position.y - 50.0).abs() > 0.01);
    Ok(())
}

#[test]
fn test_diverged_frame_keeps_last_picture() -> Result<(), AppError> {
    let outbox = EventBus::new();
    let mut settings = Settings {
        layout_mode: LayoutMode::Force,
        ..Settings::default()
    };
    settings.force.charge_strength = f32::INFINITY;
    let mut ctrl = TreeViewController::new(settings, outbox.clone());
    ctrl.members_changed(&[Member::named("1", "A", "X"), Member::named("2", "B", "X")])?;
    let before = ctrl.scene();

    let ticket = ctrl.request_frame().expect("simulation should be running");
    let result = ctrl.advance_frame(ticket);
    assert!(matches!(
        result,
        Some(Err(AppError::Layout(LayoutError::Diverged { .. })))
    ));

    let after = ctrl.scene();
    assert_eq!(after.nodes, before.nodes);
    assert!(matches!(after.placeholder, Some(Placeholder::Error(_))));
    assert!(ctrl.request_frame().is_none());
    assert!(outbox
        .drain()
        .iter()
        .any(|e| matches!(e, Event::ShowError { .. })));
    Ok(())
}

#[test]
fn test_mode_switch_bumps_epoch() -> Result<(), AppError> {
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);
    ctrl.members_changed(&family())?;
    let epoch = ctrl.epoch();
    ctrl.set_layout_mode(LayoutMode::Force)?;
    assert!(ctrl.epoch() > epoch);
    assert_eq!(ctrl.scene().mode, LayoutMode::Force);
    assert_eq!(ctrl.scene().nodes.len(), 3);
    assert!(ctrl.request_frame().is_some());

    ctrl.set_layout_mode(LayoutMode::Hierarchical)?;
    assert!(ctrl.request_frame().is_none());
    Ok(())
}

#[test]
fn test_events_drive_the_controller() {
    let inbox = EventBus::new();
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);

    inbox.publish(Event::ViewportResized {
        width: 0.0,
        height: 0.0,
    });
    inbox.publish(Event::MembersChanged { members: family() });
    inbox.publish(Event::SetLayoutMode(LayoutMode::Force));
    inbox.publish(Event::MemberSelected { id: id("1") });
    inbox.dispatch_to(&mut ctrl);

    assert_eq!(ctrl.viewport().width, 320.0);
    assert_eq!(ctrl.mode(), LayoutMode::Force);
    assert_eq!(ctrl.scene().nodes.len(), 3);
    assert_eq!(ctrl.selection().map(|r| r.children.len()), Some(2));
}

#[test]
fn test_sync_store_follows_revisions() -> Result<(), AppError> {
    let mut store = MemberStore::new(FamilyTree::new("t1", "Dupont", "owner"));
    let (mut ctrl, _) = controller(LayoutMode::Hierarchical);

    let parent = store.insert(MemberDraft::new("Marie", "Dupont"), "owner")?;
    let mut child = MemberDraft::new("Jean", "Dupont");
    child.parent_id1 = Some(parent.id.clone());
    store.insert(child, "owner")?;

    assert!(ctrl.sync_store(&store)?);
    assert!(!ctrl.sync_store(&store)?);
    assert_eq!(ctrl.graph().edge_count(), 1);

    let mut draft = StoryDraft::new("Premier jour", "Jean est né un mardi.");
    draft.related_member_ids = vec![parent.id.clone()];
    store.insert_story(draft, "owner")?;
    assert!(ctrl.sync_store(&store)?);
    ctrl.select_member(&parent.id)?;
    assert_eq!(ctrl.selected_stories().len(), 1);

    store.remove(&parent.id)?;
    assert!(ctrl.sync_store(&store)?);
    assert_eq!(ctrl.graph().len(), 1);
    assert_eq!(ctrl.graph().edge_count(), 0);
    assert!(ctrl.selection().is_none());
    assert!(ctrl.selected_stories().is_empty());
    Ok(())
}
