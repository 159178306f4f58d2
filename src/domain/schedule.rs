//! Dependency-driven schedule computation
//!
//! Computes start/end dates for every task from a project start date, the
//! inter-task dependency edges, and business-day arithmetic. The computation
//! is pure: it operates on a copy of the input and returns a new milestone
//! collection with every task and milestone dated.
//!
//! Resolution walks the dependency graph in explicit topological order, so a
//! cyclic graph that slipped past validation surfaces as
//! [`ScheduleError::Cycle`] instead of unbounded recursion. Callers should
//! still run [`validate_dependencies`](super::graph::validate_dependencies)
//! first and refuse to schedule on errors.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use thiserror::Error;

use super::calendar::{add_business_days, next_business_day};
use super::graph::TaskGraph;
use super::id::TaskId;
use super::task::Milestone;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Dependency cycle involving task \"{0}\"")]
    Cycle(TaskId),
}

/// Scheduling policy knobs
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// Keep tasks that already carry both dates, instead of recomputing them
    pub preserve_manual_dates: bool,

    /// Chain milestones in lexicographic ID order when the input data does
    /// not already express cross-milestone ordering
    pub auto_sequence: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            preserve_manual_dates: false,
            auto_sequence: true,
        }
    }
}

/// Computes a full schedule for the milestone collection
///
/// Tasks with no dependencies start at `project_start`; tasks with
/// dependencies start the day after the latest dependency end. Starts are
/// always advanced off weekends before being assigned, and a task of
/// `durationDays = d` ends `d - 1` business days after its start. Milestone
/// dates are the min/max over their dated tasks; a milestone with no tasks
/// keeps none.
pub fn compute_schedule(
    milestones: &[Milestone],
    project_start: NaiveDate,
    options: &ScheduleOptions,
) -> Result<Vec<Milestone>, ScheduleError> {
    let mut work: Vec<Milestone> = milestones.to_vec();

    if options.auto_sequence {
        inject_milestone_sequence(&mut work);
    }

    // Index every task by ID for in-place date assignment
    let mut index: HashMap<TaskId, (usize, usize)> = HashMap::new();
    for (mi, milestone) in work.iter().enumerate() {
        for (ti, task) in milestone.tasks.iter().enumerate() {
            index.entry(task.task_id.clone()).or_insert((mi, ti));
        }
    }

    let order = TaskGraph::from_milestones(&work)
        .topo_order()
        .map_err(ScheduleError::Cycle)?;

    let mut resolved: HashMap<TaskId, (NaiveDate, NaiveDate)> = HashMap::new();

    for task_id in order {
        let Some(&(mi, ti)) = index.get(&task_id) else {
            continue;
        };
        let task = &work[mi].tasks[ti];

        if options.preserve_manual_dates {
            if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
                resolved.insert(task_id, (start, end));
                continue;
            }
        }

        // Unknown dependencies contribute nothing; validation reports them
        let latest_dep_end = task
            .depends_on
            .iter()
            .filter_map(|dep| resolved.get(dep))
            .map(|&(_, end)| end)
            .max();

        let start = match latest_dep_end {
            Some(end) => next_business_day(end.checked_add_days(Days::new(1)).unwrap_or(end)),
            None => next_business_day(project_start),
        };
        let end = add_business_days(start, task.duration_days.saturating_sub(1));

        let task = &mut work[mi].tasks[ti];
        task.start_date = Some(start);
        task.end_date = Some(end);
        resolved.insert(task_id, (start, end));
    }

    for milestone in &mut work {
        milestone.refresh_dates();
    }

    Ok(work)
}

/// Default "milestones execute in ID order" policy
///
/// Milestones are viewed in lexicographic `milestoneId` order. For each
/// consecutive pair, if the current milestone's first task has no dependency
/// on a task outside its own milestone, a synthetic edge is inserted from
/// that first task onto the previous milestone's last task.
fn inject_milestone_sequence(milestones: &mut [Milestone]) {
    let mut order: Vec<usize> = (0..milestones.len()).collect();
    order.sort_by(|&a, &b| {
        milestones[a]
            .milestone_id
            .as_str()
            .cmp(milestones[b].milestone_id.as_str())
    });

    let mut synthetic: Vec<(usize, TaskId)> = Vec::new();

    for pair in order.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);

        let Some(prev_last) = milestones[prev].tasks.last() else {
            continue;
        };
        let Some(first) = milestones[cur].tasks.first() else {
            continue;
        };

        let has_external_dep = first
            .depends_on
            .iter()
            .any(|dep| !milestones[cur].contains_task(dep));

        if !has_external_dep {
            synthetic.push((cur, prev_last.task_id.clone()));
        }
    }

    for (cur, dep) in synthetic {
        milestones[cur].tasks[0].depends_on.push(dep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::Task;
    use crate::domain::MilestoneId;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task_id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn task(id: &str, duration: u32, deps: &[&str]) -> Task {
        let mut t = Task::new(task_id(id), format!("Task {}", id), duration);
        t.depends_on = deps.iter().map(|d| task_id(d)).collect();
        t
    }

    fn milestone(id: &str, tasks: Vec<Task>) -> Milestone {
        let mut m = Milestone::new(id.parse::<MilestoneId>().unwrap(), format!("Milestone {}", id));
        m.tasks = tasks;
        m
    }

    fn dates_of<'a>(milestones: &'a [Milestone], id: &str) -> (&'a NaiveDate, &'a NaiveDate) {
        let (_, t) = crate::domain::task::find_task(milestones, &task_id(id)).unwrap();
        (
            t.start_date.as_ref().unwrap(),
            t.end_date.as_ref().unwrap(),
        )
    }

    #[test]
    fn worked_example_from_monday() {
        // T1(4d) spans Mon Jan 1 .. Thu Jan 4; T2(5d, deps=[T1]) starts
        // Fri Jan 5 and ends Thu Jan 11, skipping the Jan 6-7 weekend.
        let milestones = vec![milestone(
            "M1",
            vec![task("T1", 4, &[]), task("T2", 5, &["T1"])],
        )];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        let (s1, e1) = dates_of(&scheduled, "T1");
        assert_eq!((*s1, *e1), (date("2024-01-01"), date("2024-01-04")));

        let (s2, e2) = dates_of(&scheduled, "T2");
        assert_eq!((*s2, *e2), (date("2024-01-05"), date("2024-01-11")));

        assert_eq!(scheduled[0].start_date, Some(date("2024-01-01")));
        assert_eq!(scheduled[0].end_date, Some(date("2024-01-11")));
    }

    #[test]
    fn input_is_untouched() {
        let milestones = vec![milestone("M1", vec![task("T1", 2, &[])])];
        let before = milestones.clone();

        compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default()).unwrap();
        assert_eq!(milestones, before);
    }

    #[test]
    fn deterministic() {
        let milestones = vec![
            milestone("M1", vec![task("T1", 3, &[]), task("T2", 2, &["T1"])]),
            milestone("M2", vec![task("T3", 4, &[])]),
        ];

        let a = compute_schedule(&milestones, date("2024-03-01"), &ScheduleOptions::default())
            .unwrap();
        let b = compute_schedule(&milestones, date("2024-03-01"), &ScheduleOptions::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn weekend_project_start_advances_to_monday() {
        let milestones = vec![milestone("M1", vec![task("T1", 1, &[])])];

        // Jan 6 2024 is a Saturday
        let scheduled =
            compute_schedule(&milestones, date("2024-01-06"), &ScheduleOptions::default())
                .unwrap();

        let (start, end) = dates_of(&scheduled, "T1");
        assert_eq!((*start, *end), (date("2024-01-08"), date("2024-01-08")));
    }

    #[test]
    fn dependent_of_friday_finisher_starts_monday() {
        // T1 ends Friday Jan 5; T2 may not start on the weekend
        let milestones = vec![milestone(
            "M1",
            vec![task("T1", 5, &[]), task("T2", 1, &["T1"])],
        )];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        let (start, _) = dates_of(&scheduled, "T2");
        assert_eq!(*start, date("2024-01-08"));
    }

    #[test]
    fn max_over_multiple_dependencies() {
        let milestones = vec![milestone(
            "M1",
            vec![
                task("T1", 2, &[]),
                task("T2", 8, &[]),
                task("T3", 1, &["T1", "T2"]),
            ],
        )];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        let (_, e2) = dates_of(&scheduled, "T2");
        let (s3, _) = dates_of(&scheduled, "T3");
        assert!(s3 > e2);
    }

    #[test]
    fn auto_sequence_chains_milestones_in_id_order() {
        let milestones = vec![
            milestone("M2", vec![task("T2", 1, &[])]),
            milestone("M1", vec![task("T1", 5, &[])]),
        ];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        // M2's first task is pushed after M1's last task
        let (_, e1) = dates_of(&scheduled, "T1");
        let (s2, _) = dates_of(&scheduled, "T2");
        assert!(s2 > e1);

        // The synthetic edge lives on the working copy only
        assert!(milestones[0].tasks[0].depends_on.is_empty());
    }

    #[test]
    fn auto_sequence_skips_milestones_with_existing_external_dep() {
        let milestones = vec![
            milestone("M1", vec![task("T1", 10, &[])]),
            milestone("M2", vec![task("T2", 1, &["T1"])]),
            milestone("M3", vec![task("T3", 1, &["T1"])]),
        ];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        // T3 already points outside M3, so no edge onto M2's last task is
        // added; it starts right after T1, independent of T2
        let (s3, _) = dates_of(&scheduled, "T3");
        let (_, e1) = dates_of(&scheduled, "T1");
        let expected = next_business_day(e1.checked_add_days(Days::new(1)).unwrap());
        assert_eq!(*s3, expected);
    }

    #[test]
    fn auto_sequence_can_be_disabled() {
        let milestones = vec![
            milestone("M1", vec![task("T1", 5, &[])]),
            milestone("M2", vec![task("T2", 1, &[])]),
        ];

        let options = ScheduleOptions {
            auto_sequence: false,
            ..ScheduleOptions::default()
        };
        let scheduled = compute_schedule(&milestones, date("2024-01-01"), &options).unwrap();

        let (s2, _) = dates_of(&scheduled, "T2");
        assert_eq!(*s2, date("2024-01-01"));
    }

    #[test]
    fn preserve_manual_dates_keeps_pinned_tasks() {
        let mut pinned = task("T1", 3, &[]);
        pinned.start_date = Some(date("2024-02-14"));
        pinned.end_date = Some(date("2024-02-16"));
        let milestones = vec![milestone("M1", vec![pinned, task("T2", 1, &["T1"])])];

        let options = ScheduleOptions {
            preserve_manual_dates: true,
            ..ScheduleOptions::default()
        };
        let scheduled = compute_schedule(&milestones, date("2024-01-01"), &options).unwrap();

        let (s1, e1) = dates_of(&scheduled, "T1");
        assert_eq!((*s1, *e1), (date("2024-02-14"), date("2024-02-16")));

        // The pinned end date feeds the dependent
        let (s2, _) = dates_of(&scheduled, "T2");
        assert_eq!(*s2, date("2024-02-19")); // Feb 17-18 is a weekend
    }

    #[test]
    fn manual_dates_recomputed_when_not_preserving() {
        let mut pinned = task("T1", 3, &[]);
        pinned.start_date = Some(date("2024-02-14"));
        pinned.end_date = Some(date("2024-02-16"));
        let milestones = vec![milestone("M1", vec![pinned])];

        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();

        let (s1, _) = dates_of(&scheduled, "T1");
        assert_eq!(*s1, date("2024-01-01"));
    }

    #[test]
    fn empty_collections_tolerated() {
        let scheduled =
            compute_schedule(&[], date("2024-01-01"), &ScheduleOptions::default()).unwrap();
        assert!(scheduled.is_empty());

        let milestones = vec![milestone("M1", vec![])];
        let scheduled =
            compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
                .unwrap();
        assert_eq!(scheduled[0].start_date, None);
        assert_eq!(scheduled[0].end_date, None);
    }

    #[test]
    fn cycle_is_reported_not_recursed() {
        let milestones = vec![milestone(
            "M1",
            vec![task("A", 1, &["B"]), task("B", 1, &["A"])],
        )];

        let err = compute_schedule(&milestones, date("2024-01-01"), &ScheduleOptions::default())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Cycle(_)));
    }

    mod properties {
        use super::*;
        use crate::domain::calendar::is_business_day;
        use proptest::prelude::*;

        /// One milestone with a linear chain plus a fan-in task at the end
        fn arbitrary_project() -> impl Strategy<Value = (Vec<Milestone>, NaiveDate)> {
            let durations = prop::collection::vec(1u32..10, 1..8);
            let start_offset = 0i64..400;

            (durations, start_offset).prop_map(|(durations, offset)| {
                let mut tasks: Vec<Task> = Vec::new();
                for (i, d) in durations.iter().enumerate() {
                    let mut t = task(&format!("T{}", i), *d, &[]);
                    if i > 0 {
                        t.depends_on = vec![task_id(&format!("T{}", i - 1))];
                    }
                    tasks.push(t);
                }
                let start = date("2024-01-01")
                    .checked_add_days(Days::new(offset as u64))
                    .unwrap();
                (vec![milestone("M1", tasks)], start)
            })
        }

        proptest! {
            #[test]
            fn no_task_starts_on_a_weekend((milestones, start) in arbitrary_project()) {
                let scheduled =
                    compute_schedule(&milestones, start, &ScheduleOptions::default()).unwrap();
                for m in &scheduled {
                    for t in &m.tasks {
                        prop_assert!(is_business_day(t.start_date.unwrap()));
                    }
                }
            }

            #[test]
            fn dependents_start_after_dependency_ends((milestones, start) in arbitrary_project()) {
                let scheduled =
                    compute_schedule(&milestones, start, &ScheduleOptions::default()).unwrap();
                for m in &scheduled {
                    for t in &m.tasks {
                        for dep in &t.depends_on {
                            let (_, dep_task) =
                                crate::domain::task::find_task(&scheduled, dep).unwrap();
                            prop_assert!(t.start_date.unwrap() > dep_task.end_date.unwrap());
                        }
                    }
                }
            }

            #[test]
            fn duration_spans_exact_business_days((milestones, start) in arbitrary_project()) {
                let scheduled =
                    compute_schedule(&milestones, start, &ScheduleOptions::default()).unwrap();
                for m in &scheduled {
                    for t in &m.tasks {
                        let mut day = t.start_date.unwrap();
                        let end = t.end_date.unwrap();
                        let mut business_days = 0u32;
                        while day <= end {
                            if is_business_day(day) {
                                business_days += 1;
                            }
                            day = day.succ_opt().unwrap();
                        }
                        prop_assert_eq!(business_days, t.duration_days);
                    }
                }
            }

            #[test]
            fn milestone_bounds_are_min_max((milestones, start) in arbitrary_project()) {
                let scheduled =
                    compute_schedule(&milestones, start, &ScheduleOptions::default()).unwrap();
                for m in &scheduled {
                    let min = m.tasks.iter().filter_map(|t| t.start_date).min();
                    let max = m.tasks.iter().filter_map(|t| t.end_date).max();
                    prop_assert_eq!(m.start_date, min);
                    prop_assert_eq!(m.end_date, max);
                }
            }
        }
    }
}
