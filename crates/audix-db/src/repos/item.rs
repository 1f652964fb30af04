//! Checklist item repository.
//!
//! Every item mutation compare-and-sets `checklists.revision`, re-reads the
//! checklist's items inside the unit of work, validates against a
//! [`DependencyGraph`] built from that snapshot, and returns a fresh
//! [`Progress`].

use audix_core::activity::Activity;
use audix_core::entities::ChecklistItem;
use audix_core::enums::EntityType;
use audix_core::graph::DependencyGraph;
use audix_core::ids::PREFIX_ITEM;
use audix_core::progress::Progress;
use audix_core::responses::{ItemDeletedResponse, ItemMutationResponse};

use crate::error::DatabaseError;
use crate::guard::{check_version, compare_and_bump};
use crate::helpers::{
    format_datetime, get_bool, get_opt_string, parse_datetime, parse_optional_datetime,
};
use crate::service::AudixService;
use crate::updates::item::{ItemUpdate, NewItem};

const SELECT_COLS: &str = "id, checklist_id, title, description, is_completed, is_mandatory, \
                           sort_order, depends_on_id, completed_by, completed_at, due_date, created_at";

fn row_to_item(row: &libsql::Row) -> Result<ChecklistItem, DatabaseError> {
    Ok(ChecklistItem {
        id: row.get(0)?,
        checklist_id: row.get(1)?,
        title: row.get(2)?,
        description: get_opt_string(row, 3)?,
        is_completed: get_bool(row, 4)?,
        is_mandatory: get_bool(row, 5)?,
        order: row.get(6)?,
        depends_on_id: get_opt_string(row, 7)?,
        completed_by: get_opt_string(row, 8)?,
        completed_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
        due_date: parse_optional_datetime(get_opt_string(row, 10)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

fn validate_title(title: &str) -> Result<(), DatabaseError> {
    if title.trim().is_empty() {
        return Err(DatabaseError::validation("item title must not be empty"));
    }
    Ok(())
}

fn titles(items: &[&ChecklistItem]) -> String {
    items
        .iter()
        .map(|item| item.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl AudixService {
    /// Items of one checklist in display order (`order`, then creation time).
    pub(crate) async fn fetch_items(
        &self,
        checklist_id: &str,
    ) -> Result<Vec<ChecklistItem>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM checklist_items WHERE checklist_id = ?1
                     ORDER BY sort_order, created_at, id"
                ),
                [checklist_id],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(row_to_item(&row)?);
        }
        Ok(items)
    }

    /// Load the checklist's items after checking the caller's revision.
    async fn items_at_revision(
        &self,
        checklist_id: &str,
        expected_revision: u32,
    ) -> Result<Vec<ChecklistItem>, DatabaseError> {
        let checklist = self.fetch_checklist_row(checklist_id).await?;
        check_version(
            EntityType::Checklist,
            checklist_id,
            expected_revision,
            checklist.revision,
        )?;
        self.fetch_items(checklist_id).await
    }

    async fn bump_revision(
        &self,
        checklist_id: &str,
        expected_revision: u32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<u32, DatabaseError> {
        compare_and_bump(
            self.db().conn(),
            EntityType::Checklist,
            "revision",
            checklist_id,
            expected_revision,
            &format_datetime(&at),
        )
        .await
    }

    async fn write_item(&self, item: &ChecklistItem) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "UPDATE checklist_items
                 SET title = ?1, description = ?2, is_completed = ?3, is_mandatory = ?4,
                     sort_order = ?5, depends_on_id = ?6, completed_by = ?7,
                     completed_at = ?8, due_date = ?9
                 WHERE id = ?10",
                libsql::params![
                    item.title.as_str(),
                    item.description.as_deref(),
                    i64::from(item.is_completed),
                    i64::from(item.is_mandatory),
                    item.order,
                    item.depends_on_id.as_deref(),
                    item.completed_by.as_deref(),
                    item.completed_at.as_ref().map(format_datetime),
                    item.due_date.as_ref().map(format_datetime),
                    item.id.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    /// Add an item to a checklist.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the checklist does not exist.
    /// - `Conflict` if `expected_revision` is stale.
    /// - `Validation` for an empty title or a dependency outside this checklist.
    pub async fn add_item(
        &self,
        checklist_id: &str,
        expected_revision: u32,
        new: NewItem,
        actor: &str,
    ) -> Result<ItemMutationResponse, DatabaseError> {
        validate_title(&new.title)?;
        let unit = self.begin().await?;
        let result = self
            .insert_item(checklist_id, expected_revision, new, actor)
            .await;
        let response = unit.finish(result).await?;
        tracing::info!(
            checklist_id,
            item_id = %response.item.id,
            revision = response.checklist_revision,
            "checklist item added"
        );
        Ok(response)
    }

    async fn insert_item(
        &self,
        checklist_id: &str,
        expected_revision: u32,
        new: NewItem,
        actor: &str,
    ) -> Result<ItemMutationResponse, DatabaseError> {
        let mut items = self
            .items_at_revision(checklist_id, expected_revision)
            .await?;
        let id = self.db().generate_id(PREFIX_ITEM).await?;
        if let Some(dep) = new.depends_on_id.as_deref() {
            DependencyGraph::new(&items).validate_edge(&id, dep)?;
        }

        let order = match new.order {
            Some(order) => order,
            None => match items.iter().map(|item| item.order).max() {
                None => 0,
                Some(max) => max
                    .checked_add(1)
                    .ok_or_else(|| DatabaseError::validation("item order out of range"))?,
            },
        };
        let now = self.now();
        let item = ChecklistItem {
            id,
            checklist_id: checklist_id.to_string(),
            title: new.title.trim().to_string(),
            description: new.description,
            is_completed: false,
            is_mandatory: new.is_mandatory,
            order,
            depends_on_id: new.depends_on_id,
            completed_by: None,
            completed_at: None,
            due_date: new.due_date,
            created_at: now,
        };

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO checklist_items ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, NULL, NULL, ?8, ?9)"
                ),
                libsql::params![
                    item.id.as_str(),
                    checklist_id,
                    item.title.as_str(),
                    item.description.as_deref(),
                    i64::from(item.is_mandatory),
                    item.order,
                    item.depends_on_id.as_deref(),
                    item.due_date.as_ref().map(format_datetime),
                    format_datetime(&now)
                ],
            )
            .await?;
        let revision = self.bump_revision(checklist_id, expected_revision, now).await?;

        self.record_activity(
            actor,
            Activity::ItemAdded {
                checklist_id: checklist_id.to_string(),
                item_id: item.id.clone(),
                title: item.title.clone(),
            },
            now,
        )
        .await?;

        items.push(item.clone());
        Ok(ItemMutationResponse {
            progress: Progress::compute(checklist_id, &items),
            item,
            checklist_revision: revision,
        })
    }

    /// Update an item. Completing it requires every transitive prerequisite
    /// to be completed, whatever their mandatory flags.
    ///
    /// An update that supplies no fields only performs the revision check.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the checklist or item does not exist.
    /// - `Conflict` if `expected_revision` is stale.
    /// - `DependencyCycle` if the new dependency would close a cycle.
    /// - `Validation` for an empty title, a dependency outside this checklist,
    ///   or completion with unmet prerequisites.
    pub async fn update_item(
        &self,
        checklist_id: &str,
        item_id: &str,
        expected_revision: u32,
        update: ItemUpdate,
        actor: &str,
    ) -> Result<ItemMutationResponse, DatabaseError> {
        if let Some(title) = update.title.as_deref() {
            validate_title(title)?;
        }
        let unit = self.begin().await?;
        let result = self
            .apply_item_update(checklist_id, item_id, expected_revision, &update, actor)
            .await;
        let response = unit.finish(result).await?;
        tracing::info!(
            checklist_id,
            item_id,
            revision = response.checklist_revision,
            fields = ?update.changed_fields(),
            "checklist item updated"
        );
        Ok(response)
    }

    async fn apply_item_update(
        &self,
        checklist_id: &str,
        item_id: &str,
        expected_revision: u32,
        update: &ItemUpdate,
        actor: &str,
    ) -> Result<ItemMutationResponse, DatabaseError> {
        let mut items = self
            .items_at_revision(checklist_id, expected_revision)
            .await?;
        let position = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| DatabaseError::not_found(EntityType::ChecklistItem, item_id))?;

        if update.is_empty() {
            let item = items[position].clone();
            return Ok(ItemMutationResponse {
                progress: Progress::compute(checklist_id, &items),
                item,
                checklist_revision: expected_revision,
            });
        }

        let current = items[position].clone();
        let mut next = current.clone();
        if let Some(title) = &update.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &update.description {
            next.description.clone_from(description);
        }
        if let Some(is_mandatory) = update.is_mandatory {
            next.is_mandatory = is_mandatory;
        }
        if let Some(order) = update.order {
            next.order = order;
        }
        if let Some(due_date) = update.due_date {
            next.due_date = due_date;
        }
        if let Some(depends_on_id) = &update.depends_on_id {
            if depends_on_id != &current.depends_on_id {
                if let Some(dep) = depends_on_id.as_deref() {
                    DependencyGraph::new(&items).validate_edge(item_id, dep)?;
                }
                next.depends_on_id.clone_from(depends_on_id);
            }
        }

        // Evaluate completion against the graph as it will be after this update.
        items[position] = next.clone();
        let now = self.now();
        match update.is_completed {
            Some(true) if !current.is_completed => {
                let graph = DependencyGraph::new(&items);
                let unmet = graph.unmet_prerequisites(&next);
                if !unmet.is_empty() {
                    return Err(DatabaseError::validation(format!(
                        "dependency not satisfied: complete {} first",
                        titles(&unmet)
                    )));
                }
                if !graph.is_satisfied(&next) {
                    return Err(DatabaseError::validation(
                        "dependency not satisfied: prerequisite no longer exists",
                    ));
                }
                next.is_completed = true;
                next.completed_by = Some(actor.to_string());
                next.completed_at = Some(now);
            }
            Some(false) if current.is_completed => {
                next.is_completed = false;
                next.completed_by = None;
                next.completed_at = None;
            }
            _ => {}
        }
        items[position] = next.clone();

        self.write_item(&next).await?;
        let revision = self.bump_revision(checklist_id, expected_revision, now).await?;

        let activity = match (current.is_completed, next.is_completed) {
            (false, true) => Activity::ItemCompleted {
                checklist_id: checklist_id.to_string(),
                item_id: item_id.to_string(),
            },
            (true, false) => Activity::ItemReopened {
                checklist_id: checklist_id.to_string(),
                item_id: item_id.to_string(),
            },
            _ => Activity::ItemUpdated {
                checklist_id: checklist_id.to_string(),
                item_id: item_id.to_string(),
                changed_fields: update.changed_fields(),
            },
        };
        self.record_activity(actor, activity, now).await?;

        Ok(ItemMutationResponse {
            progress: Progress::compute(checklist_id, &items),
            item: next,
            checklist_revision: revision,
        })
    }

    /// Delete an item nothing depends on.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the checklist or item does not exist.
    /// - `Conflict` if `expected_revision` is stale.
    /// - `Validation` if other items depend on this one.
    pub async fn delete_item(
        &self,
        checklist_id: &str,
        item_id: &str,
        expected_revision: u32,
        actor: &str,
    ) -> Result<ItemDeletedResponse, DatabaseError> {
        let unit = self.begin().await?;
        let result = self
            .remove_item(checklist_id, item_id, expected_revision, actor)
            .await;
        let response = unit.finish(result).await?;
        tracing::info!(
            checklist_id,
            item_id,
            revision = response.checklist_revision,
            "checklist item deleted"
        );
        Ok(response)
    }

    async fn remove_item(
        &self,
        checklist_id: &str,
        item_id: &str,
        expected_revision: u32,
        actor: &str,
    ) -> Result<ItemDeletedResponse, DatabaseError> {
        let mut items = self
            .items_at_revision(checklist_id, expected_revision)
            .await?;
        let graph = DependencyGraph::new(&items);
        if graph.get(item_id).is_none() {
            return Err(DatabaseError::not_found(EntityType::ChecklistItem, item_id));
        }
        let dependents = graph.dependents_of(item_id);
        if !dependents.is_empty() {
            return Err(DatabaseError::validation(format!(
                "cannot delete item: {} depend on it",
                titles(&dependents)
            )));
        }

        self.db()
            .conn()
            .execute("DELETE FROM checklist_items WHERE id = ?1", [item_id])
            .await?;
        let now = self.now();
        let revision = self.bump_revision(checklist_id, expected_revision, now).await?;
        self.record_activity(
            actor,
            Activity::ItemDeleted {
                checklist_id: checklist_id.to_string(),
                item_id: item_id.to_string(),
            },
            now,
        )
        .await?;

        items.retain(|item| item.id != item_id);
        Ok(ItemDeletedResponse {
            item_id: item_id.to_string(),
            checklist_revision: revision,
            progress: Progress::compute(checklist_id, &items),
        })
    }
}

#[cfg(test)]
mod tests {
    use audix_core::errors::CoreError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::test_support::helpers::test_service;
    use crate::updates::item::ItemUpdateBuilder;

    use super::*;

    #[tokio::test]
    async fn add_bumps_revision_and_orders() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();

        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a").mandatory(), "alice")
            .await
            .unwrap();
        assert_eq!(a.checklist_revision, 2);
        assert_eq!(a.item.order, 0);
        assert_eq!(a.progress.total_items, 1);
        assert_eq!(a.progress.mandatory_items, 1);

        let b = svc
            .add_item(&checklist.id, 2, NewItem::new("b"), "alice")
            .await
            .unwrap();
        assert_eq!(b.item.order, 1);
        assert_eq!(b.checklist_revision, 3);

        let err = svc
            .add_item(&checklist.id, 2, NewItem::new("late"), "bob")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Core(CoreError::Conflict {
                expected: 2,
                actual: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn default_order_after_max_order_is_rejected() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let last = NewItem {
            order: Some(i64::MAX),
            ..NewItem::new("last")
        };
        let added = svc.add_item(&checklist.id, 1, last, "alice").await.unwrap();
        assert_eq!(added.item.order, i64::MAX);

        let err = svc
            .add_item(&checklist.id, 2, NewItem::new("next"), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        let checklist = svc.get_checklist(&checklist.id).await.unwrap();
        assert_eq!(checklist.revision, 2);
        assert_eq!(checklist.items.len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_foreign_dependency() {
        let svc = test_service().await;
        let one = svc.create_checklist("one", None, None, "alice").await.unwrap();
        let two = svc.create_checklist("two", None, None, "alice").await.unwrap();
        let foreign = svc
            .add_item(&one.id, 1, NewItem::new("elsewhere"), "alice")
            .await
            .unwrap();

        let err = svc
            .add_item(&two.id, 1, NewItem::new("x").depends_on(foreign.item.id), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));
        assert_eq!(svc.get_checklist(&two.id).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn completion_requires_whole_chain() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a"), "alice")
            .await
            .unwrap()
            .item;
        let b = svc
            .add_item(&checklist.id, 2, NewItem::new("b").depends_on(a.id.clone()), "alice")
            .await
            .unwrap()
            .item;
        let c = svc
            .add_item(&checklist.id, 3, NewItem::new("c").depends_on(b.id.clone()), "alice")
            .await
            .unwrap()
            .item;

        let complete = || ItemUpdateBuilder::new().completed(true).build();

        let err = svc
            .update_item(&checklist.id, &c.id, 4, complete(), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        svc.update_item(&checklist.id, &a.id, 4, complete(), "bob")
            .await
            .unwrap();
        // b is still open, so c stays blocked even though a is done.
        let err = svc
            .update_item(&checklist.id, &c.id, 5, complete(), "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        svc.update_item(&checklist.id, &b.id, 5, complete(), "bob")
            .await
            .unwrap();
        let done = svc
            .update_item(&checklist.id, &c.id, 6, complete(), "carol")
            .await
            .unwrap();
        assert!(done.item.is_completed);
        assert_eq!(done.item.completed_by.as_deref(), Some("carol"));
        assert!(done.item.completed_at.is_some());
        assert_eq!(done.checklist_revision, 7);
        assert!(done.progress.is_complete());
        assert!((done.progress.completion_percentage - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn reopen_clears_completion_metadata() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a"), "alice")
            .await
            .unwrap()
            .item;
        svc.update_item(&checklist.id, &a.id, 2, ItemUpdateBuilder::new().completed(true).build(), "bob")
            .await
            .unwrap();

        let reopened = svc
            .update_item(&checklist.id, &a.id, 3, ItemUpdateBuilder::new().completed(false).build(), "bob")
            .await
            .unwrap();
        assert!(!reopened.item.is_completed);
        assert_eq!(reopened.item.completed_by, None);
        assert_eq!(reopened.item.completed_at, None);
        assert_eq!(reopened.progress.completed_items, 0);
    }

    #[rstest]
    #[case::self_reference(true)]
    #[case::back_edge(false)]
    #[tokio::test]
    async fn cycles_are_rejected(#[case] self_reference: bool) {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a"), "alice")
            .await
            .unwrap()
            .item;
        let b = svc
            .add_item(&checklist.id, 2, NewItem::new("b").depends_on(a.id.clone()), "alice")
            .await
            .unwrap()
            .item;

        let target = if self_reference { a.id.clone() } else { b.id.clone() };
        let err = svc
            .update_item(
                &checklist.id,
                &a.id,
                3,
                ItemUpdateBuilder::new().depends_on(Some(target)).build(),
                "alice",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::DependencyCycle { .. })));
        assert_eq!(svc.get_checklist(&checklist.id).await.unwrap().revision, 3);
    }

    #[tokio::test]
    async fn delete_blocked_by_dependents() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a"), "alice")
            .await
            .unwrap()
            .item;
        let b = svc
            .add_item(&checklist.id, 2, NewItem::new("b").depends_on(a.id.clone()), "alice")
            .await
            .unwrap()
            .item;

        let err = svc.delete_item(&checklist.id, &a.id, 3, "alice").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Validation(_))));

        let deleted = svc.delete_item(&checklist.id, &b.id, 3, "alice").await.unwrap();
        assert_eq!(deleted.checklist_revision, 4);
        assert_eq!(deleted.progress.total_items, 1);
        svc.delete_item(&checklist.id, &a.id, 4, "alice").await.unwrap();

        let err = svc.delete_item(&checklist.id, &a.id, 5, "alice").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn empty_update_checks_revision_only() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let a = svc
            .add_item(&checklist.id, 1, NewItem::new("a"), "alice")
            .await
            .unwrap();

        let same = svc
            .update_item(&checklist.id, &a.item.id, 2, ItemUpdate::default(), "alice")
            .await
            .unwrap();
        assert_eq!(same.item, a.item);
        assert_eq!(same.checklist_revision, 2);

        let err = svc
            .update_item(&checklist.id, &a.item.id, 1, ItemUpdate::default(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let svc = test_service().await;
        let checklist = svc.create_checklist("C", None, None, "alice").await.unwrap();
        let err = svc
            .update_item(
                &checklist.id,
                "itm-00000000dead",
                1,
                ItemUpdateBuilder::new().title("x").build(),
                "alice",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Core(CoreError::NotFound { .. })));
    }
}
