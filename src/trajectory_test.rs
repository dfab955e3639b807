use super::*;

fn record(diagram: &str, ts: &str, action_type: &str) -> ActionRecord {
    ActionRecord {
        action_type: action_type.to_owned(),
        timestamp: ts.to_owned(),
        diagram_id: Some(diagram.to_owned()),
        ..ActionRecord::default()
    }
}

fn generated(diagram: &str, ts: &str, prompt: &str, code: &str) -> ActionRecord {
    let mut r = record(diagram, ts, "diagram_generated");
    r.prompt = Some(prompt.to_owned());
    r.mermaid_code = Some(code.to_owned());
    r.metadata.insert("num_variations".into(), 3.into());
    r
}

#[test]
fn groups_by_diagram_in_first_seen_order() {
    let records = vec![
        record("b", "2025-01-01T00:00:02Z", "zoom"),
        record("a", "2025-01-01T00:00:01Z", "pan"),
        record("b", "2025-01-01T00:00:00Z", "tab_away"),
    ];
    let trajectories = build_trajectories(&records);

    assert_eq!(trajectories.len(), 2);
    assert_eq!(trajectories[0].diagram_id, "b");
    assert_eq!(trajectories[0].trajectory[0].action.action_type, "tab_away");
    assert_eq!(trajectories[0].metadata.start_timestamp, "2025-01-01T00:00:00Z");
    assert_eq!(trajectories[1].diagram_id, "a");
}

#[test]
fn missing_diagram_id_groups_as_unknown() {
    let mut r = record("x", "t", "zoom");
    r.diagram_id = None;
    let trajectories = build_trajectories(&[r]);
    assert_eq!(trajectories[0].diagram_id, "unknown");
}

#[test]
fn states_track_prompt_and_diagram() {
    let records = vec![
        generated("d", "1", "two boxes", "graph TD\n A-->B"),
        record("d", "2", "mermaid_copy"),
    ];
    let t = &build_trajectories(&records)[0];

    assert_eq!(t.trajectory[0].state.diagram, "");
    assert_eq!(t.trajectory[0].next_state.diagram, "graph TD\n A-->B");
    assert_eq!(t.trajectory[1].state.prompt, "two boxes");
    assert_eq!(t.trajectory[0].reasoning, "System generated 3 diagram variations.");
    let answer = t.final_answer.as_ref().unwrap();
    assert_eq!(answer.answer, "graph TD\n A-->B");
    assert_eq!(answer.metadata.num_steps, 2);
}

#[test]
fn successful_short_session_scores_bonuses() {
    let mut select = record("d", "2", "variation_selection");
    select.variation_index = Some(1);
    select.mermaid_code = Some("B".into());
    let mut rate = record("d", "3", "feedback");
    rate.rating = Some(5);
    let records = vec![generated("d", "1", "p", "A"), select, rate];

    let t = &build_trajectories(&records)[0];

    let rewards: Vec<i64> = t.trajectory.iter().map(|s| s.reward).collect();
    assert_eq!(rewards, vec![2, 5, 5]);
    // 12 from steps, +5 final diagram, +3 generated and selected,
    // +3 rating >= 4, +3 for <= 5 steps.
    assert!((t.reward - 26.0).abs() < f64::EPSILON);
    assert_eq!(t.trajectory[1].reasoning, "User selected variation 2 as best match.");
}

#[test]
fn abandoned_session_is_penalized() {
    let mut records: Vec<ActionRecord> = (0..4)
        .map(|i| {
            let mut r = record("d", &format!("{i}"), "prompt_update");
            r.prompt = Some(format!("prompt {i}"));
            r
        })
        .collect();
    let mut away = record("d", "9", "tab_away");
    away.metadata.insert("had_diagram".into(), false.into());
    records.push(away);

    let t = &build_trajectories(&records)[0];
    let rewards: Vec<i64> = t.trajectory.iter().map(|s| s.reward).collect();

    assert_eq!(rewards, vec![1, 1, 0, 0, -2]);
    // 0 from steps, -5 no diagram after more than 3 steps.
    assert!((t.reward + 5.0).abs() < f64::EPSILON);
    assert!(t.final_answer.is_none());
}

#[test]
fn new_button_penalty_depends_on_prior_diagram() {
    let records = vec![
        record("d", "0", "new_button"),
        generated("d", "1", "p", "A"),
        record("d", "2", "zoom"),
        record("d", "3", "new_button"),
    ];
    let t = &build_trajectories(&records)[0];
    assert_eq!(t.trajectory[0].reward, -1);
    assert_eq!(t.trajectory[3].reward, -5);
}

#[test]
fn feedback_rewards_follow_rating() {
    for (rating, expected) in [(1, -5), (2, -2), (3, 1), (4, 3), (5, 5)] {
        let mut r = record("d", "0", "feedback");
        r.rating = Some(rating);
        let t = &build_trajectories(&[r])[0];
        assert_eq!(t.trajectory[0].reward, expected, "rating {rating}");
    }
}

#[test]
fn records_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rl_actions.json");
    let output = dir.path().join("trajectories.json");
    let json = serde_json::to_string(&vec![generated("d", "1", "p", "A")]).unwrap();
    std::fs::write(&input, format!("\u{feff}{json}")).unwrap();

    let records = load_records(&input).unwrap();
    write_trajectories(&output, &build_trajectories(&records)).unwrap();

    let written: Vec<Trajectory> = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written[0].diagram_id, "d");
    assert_eq!(written[0].trajectory[0].action.action_type, "diagram_generated");
}
