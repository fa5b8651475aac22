//! Equipment category tree service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    lending::permissions::{self, Action},
    models::category::{creates_cycle, CreateCategory, EquipmentCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, lab_id: Option<i32>) -> AppResult<Vec<EquipmentCategory>> {
        self.repository.categories_list(lab_id).await
    }

    pub async fn create(&self, actor_id: i32, data: &CreateCategory) -> AppResult<EquipmentCategory> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        data.validate()?;
        if let Some(parent_id) = data.parent_id {
            self.repository.categories_get_by_id(parent_id).await?;
        }
        if let Some(lab_id) = data.lab_id {
            self.repository.labs_get_by_id(lab_id).await?;
        }
        self.repository.categories_create(data).await
    }

    /// Re-parent a category; refused when it would close a loop
    pub async fn move_category(&self, actor_id: i32, id: i32, new_parent: Option<i32>) -> AppResult<EquipmentCategory> {
        let actor = self.repository.users_get_by_id(actor_id).await?;
        permissions::require(&actor, Action::ManageEquipment)?;
        self.repository.categories_get_by_id(id).await?;
        if let Some(parent_id) = new_parent {
            self.repository.categories_get_by_id(parent_id).await?;
        }

        let mut tx = self.repository.begin().await?;
        let parents = self.repository.categories_lock_parent_map(&mut tx).await?;
        if creates_cycle(&parents, id, new_parent) {
            return Err(AppError::Validation(format!(
                "Moving category {} under {:?} would create a cycle",
                id, new_parent
            )));
        }
        let category = self.repository.categories_set_parent(&mut tx, id, new_parent).await?;
        tx.commit().await?;

        tracing::info!(category_id = id, parent_id = ?new_parent, "Category moved");
        Ok(category)
    }
}
