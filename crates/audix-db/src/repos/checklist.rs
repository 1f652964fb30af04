//! Checklist repository.

use audix_core::activity::Activity;
use audix_core::entities::{Checklist, OwnerRef};
use audix_core::enums::{EntityType, OwnerKind};
use audix_core::graph::DependencyGraph;
use audix_core::ids::PREFIX_CHECKLIST;
use audix_core::progress::Progress;
use audix_core::responses::ChecklistOrderResponse;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_string, get_u32, parse_datetime};
use crate::service::AudixService;

const SELECT_COLS: &str =
    "id, template_id, report_id, name, description, created_by, revision, created_at, updated_at";

fn row_to_checklist(row: &libsql::Row) -> Result<Checklist, DatabaseError> {
    Ok(Checklist {
        id: row.get(0)?,
        owner: OwnerRef::from_columns(get_opt_string(row, 1)?, get_opt_string(row, 2)?),
        name: row.get(3)?,
        description: get_opt_string(row, 4)?,
        created_by: row.get(5)?,
        revision: get_u32(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
        items: Vec::new(),
    })
}

impl AudixService {
    /// The checklist row without items.
    pub(crate) async fn fetch_checklist_row(&self, id: &str) -> Result<Checklist, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM checklists WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => row_to_checklist(&row),
            None => Err(DatabaseError::not_found(EntityType::Checklist, id)),
        }
    }

    async fn fetch_checklist(&self, id: &str) -> Result<Checklist, DatabaseError> {
        let mut checklist = self.fetch_checklist_row(id).await?;
        checklist.items = self.fetch_items(id).await?;
        Ok(checklist)
    }

    /// # Errors
    ///
    /// - `Validation` for an empty name.
    /// - `NotFound` if `owner` is given and does not exist.
    pub async fn create_checklist(
        &self,
        name: &str,
        description: Option<&str>,
        owner: Option<&OwnerRef>,
        actor: &str,
    ) -> Result<Checklist, DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::validation("checklist name must not be empty"));
        }
        let unit = self.begin().await?;
        let result = self.insert_checklist(name, description, owner, actor).await;
        let checklist = unit.finish(result).await?;
        tracing::info!(checklist_id = %checklist.id, actor, "checklist created");
        Ok(checklist)
    }

    async fn insert_checklist(
        &self,
        name: &str,
        description: Option<&str>,
        owner: Option<&OwnerRef>,
        actor: &str,
    ) -> Result<Checklist, DatabaseError> {
        if let Some(owner) = owner {
            self.ensure_owner_exists(owner).await?;
        }
        let id = self.db().generate_id(PREFIX_CHECKLIST).await?;
        let now = self.now();
        let (template_id, report_id) = owner.map_or((None, None), OwnerRef::columns);

        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO checklists ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)"
                ),
                libsql::params![
                    id.as_str(),
                    template_id,
                    report_id,
                    name,
                    description,
                    actor,
                    format_datetime(&now)
                ],
            )
            .await?;

        self.record_activity(
            actor,
            Activity::ChecklistCreated {
                checklist_id: id.clone(),
                name: name.to_string(),
            },
            now,
        )
        .await?;

        Ok(Checklist {
            id,
            owner: owner.cloned(),
            name: name.to_string(),
            description: description.map(String::from),
            created_by: actor.to_string(),
            revision: 1,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        })
    }

    /// A checklist with its items in display order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the checklist does not exist.
    pub async fn get_checklist(&self, id: &str) -> Result<Checklist, DatabaseError> {
        let _read = self.read().await?;
        self.fetch_checklist(id).await
    }

    /// Checklists attached to a template, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not exist.
    pub async fn list_checklists_for_template(
        &self,
        template_id: &str,
    ) -> Result<Vec<Checklist>, DatabaseError> {
        self.list_checklists_for(&OwnerRef::template(template_id))
            .await
    }

    /// Checklists attached to a template or report, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owner does not exist.
    pub async fn list_checklists_for(
        &self,
        owner: &OwnerRef,
    ) -> Result<Vec<Checklist>, DatabaseError> {
        let _read = self.read().await?;
        self.ensure_owner_exists(owner).await?;
        let column = match owner.kind {
            OwnerKind::Template => "template_id",
            OwnerKind::Report => "report_id",
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM checklists WHERE {column} = ?1
                     ORDER BY created_at, id"
                ),
                [owner.id.as_str()],
            )
            .await?;

        let mut checklists = Vec::new();
        while let Some(row) = rows.next().await? {
            checklists.push(row_to_checklist(&row)?);
        }
        for checklist in &mut checklists {
            checklist.items = self.fetch_items(&checklist.id).await?;
        }
        Ok(checklists)
    }

    /// Delete a checklist and its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the checklist does not exist.
    pub async fn delete_checklist(&self, id: &str, actor: &str) -> Result<(), DatabaseError> {
        let unit = self.begin().await?;
        let result = self.remove_checklist(id, actor).await;
        unit.finish(result).await?;
        tracing::info!(checklist_id = id, actor, "checklist deleted");
        Ok(())
    }

    async fn remove_checklist(&self, id: &str, actor: &str) -> Result<(), DatabaseError> {
        let removed = self
            .db()
            .conn()
            .execute("DELETE FROM checklists WHERE id = ?1", [id])
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found(EntityType::Checklist, id));
        }
        self.record_activity(
            actor,
            Activity::ChecklistDeleted {
                checklist_id: id.to_string(),
            },
            self.now(),
        )
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the checklist does not exist.
    pub async fn checklist_progress(&self, id: &str) -> Result<Progress, DatabaseError> {
        let _read = self.read().await?;
        let checklist = self.fetch_checklist(id).await?;
        Ok(Progress::compute(&checklist.id, &checklist.items))
    }

    /// Item ids with every prerequisite before its dependents.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the checklist does not exist.
    /// - `DependencyCycle` if stored data contains a cycle.
    pub async fn checklist_order(&self, id: &str) -> Result<ChecklistOrderResponse, DatabaseError> {
        let _read = self.read().await?;
        let checklist = self.fetch_checklist(id).await?;
        let item_ids = DependencyGraph::new(&checklist.items).topological_order()?;
        Ok(ChecklistOrderResponse {
            checklist_id: checklist.id,
            item_ids,
        })
    }
}
