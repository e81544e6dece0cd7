//! Category operations.
//!
//! Names are unique per owner and level. The tree stays acyclic: every
//! write that sets a parent reference walks the ancestor chain before it is
//! persisted, independent of any store-level hook.

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryNode, EngineError, NewCategoryCmd, ResultEngine, UpdateCategoryCmd,
    budgets, categories, transactions,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    pub async fn new_category(&self, cmd: NewCategoryCmd) -> ResultEngine<Category> {
        let name = normalize_required_name(&cmd.name, "category")?;

        with_tx!(self, |db_tx| {
            if let Some(parent_id) = cmd.parent_id {
                self.require_category(&db_tx, parent_id, &cmd.user_id).await?;
            }
            self.assert_name_free_at_level(&db_tx, &cmd.user_id, &name, cmd.parent_id, None)
                .await?;

            let category = Category::new(cmd.user_id, name, cmd.kind, cmd.parent_id);
            categories::ActiveModel::from(&category).insert(&db_tx).await?;
            Ok(category)
        })
    }

    pub async fn category(&self, category_id: Uuid, user_id: &str) -> ResultEngine<Category> {
        self.require_category(&self.database, category_id, user_id)
            .await
    }

    /// Returns the owner's categories as a forest, roots sorted by name.
    pub async fn list_categories(&self, user_id: &str) -> ResultEngine<Vec<CategoryNode>> {
        let models = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;

        let categories: Vec<Category> = models
            .into_iter()
            .map(Category::try_from)
            .collect::<ResultEngine<_>>()?;
        Ok(build_forest(categories))
    }

    pub async fn update_category(&self, cmd: UpdateCategoryCmd) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            let mut category = self
                .require_category(&db_tx, cmd.category_id, &cmd.user_id)
                .await?;

            let new_parent_id = cmd.parent_id.or(category.parent_id);
            if let Some(parent_id) = cmd.parent_id {
                self.require_category(&db_tx, parent_id, &cmd.user_id).await?;
                self.assert_no_cycle(&db_tx, &cmd.user_id, category.id, parent_id)
                    .await?;
            }

            if let Some(name) = cmd.name.as_deref() {
                let name = normalize_required_name(name, "category")?;
                if name != category.name || new_parent_id != category.parent_id {
                    self.assert_name_free_at_level(
                        &db_tx,
                        &cmd.user_id,
                        &name,
                        new_parent_id,
                        Some(category.id),
                    )
                    .await?;
                }
                category.name = name;
            } else if new_parent_id != category.parent_id {
                self.assert_name_free_at_level(
                    &db_tx,
                    &cmd.user_id,
                    &category.name,
                    new_parent_id,
                    Some(category.id),
                )
                .await?;
            }
            category.parent_id = new_parent_id;

            categories::ActiveModel::from(&category).update(&db_tx).await?;
            Ok(category)
        })
    }

    /// Delete a category.
    ///
    /// Deletion is blocked while subcategories exist. A category referenced
    /// by transactions or budgets is only marked inactive; otherwise the row
    /// is removed.
    pub async fn delete_category(&self, category_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let mut category = self.require_category(&db_tx, category_id, user_id).await?;

            let has_children = categories::Entity::find()
                .filter(categories::Column::UserId.eq(user_id))
                .filter(categories::Column::ParentId.eq(category_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if has_children {
                return Err(EngineError::HasDependents(
                    "category has subcategories".to_string(),
                ));
            }

            let id = category_id.to_string();
            let referenced = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(
                    transactions::Column::CategoryId
                        .eq(id.clone())
                        .or(transactions::Column::SubcategoryId.eq(id.clone())),
                )
                .one(&db_tx)
                .await?
                .is_some()
                || budgets::Entity::find()
                    .filter(budgets::Column::UserId.eq(user_id))
                    .filter(budgets::Column::CategoryId.eq(id.clone()))
                    .one(&db_tx)
                    .await?
                    .is_some();

            if referenced {
                category.active = false;
                categories::ActiveModel::from(&category).update(&db_tx).await?;
            } else {
                categories::Entity::delete_by_id(id).exec(&db_tx).await?;
            }
            Ok(())
        })
    }

    pub(super) async fn require_category<C: ConnectionTrait>(
        &self,
        conn: &C,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id.to_string())
            .filter(categories::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
        Category::try_from(model)
    }

    async fn assert_name_free_at_level<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        name: &str,
        parent_id: Option<Uuid>,
        exclude_id: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::UserId.eq(user_id))
            .filter(categories::Column::Name.eq(name));
        query = match parent_id {
            Some(parent_id) => {
                query.filter(categories::Column::ParentId.eq(parent_id.to_string()))
            }
            None => query.filter(categories::Column::ParentId.is_null()),
        };
        if let Some(exclude_id) = exclude_id {
            query = query.filter(categories::Column::Id.ne(exclude_id.to_string()));
        }

        if query.one(conn).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }

    /// Walks up from `new_parent_id`; reaching `category_id` means the new
    /// reference would close a loop.
    async fn assert_no_cycle<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        category_id: Uuid,
        new_parent_id: Uuid,
    ) -> ResultEngine<()> {
        let mut current = Some(new_parent_id);
        while let Some(id) = current {
            if id == category_id {
                return Err(EngineError::CategoryCycle(
                    "category cannot be its own ancestor".to_string(),
                ));
            }
            let model = categories::Entity::find_by_id(id.to_string())
                .filter(categories::Column::UserId.eq(user_id))
                .one(conn)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
            current = model.parent_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
        }
        Ok(())
    }
}

fn build_forest(categories: Vec<Category>) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();
    for category in categories {
        by_parent.entry(category.parent_id).or_default().push(category);
    }

    let roots = by_parent.remove(&None).unwrap_or_default();
    roots
        .into_iter()
        .map(|root| attach_children(root, &mut by_parent))
        .collect()
}

fn attach_children(
    category: Category,
    by_parent: &mut HashMap<Option<Uuid>, Vec<Category>>,
) -> CategoryNode {
    let children = by_parent
        .remove(&Some(category.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_children(child, by_parent))
        .collect();
    CategoryNode { category, children }
}

#[cfg(test)]
mod tests {
    use crate::CategoryKind;

    use super::*;

    fn category(name: &str, parent_id: Option<Uuid>) -> Category {
        Category::new(
            "alice".to_string(),
            name.to_string(),
            CategoryKind::Expense,
            parent_id,
        )
    }

    #[test]
    fn build_forest_nests_children_under_roots() {
        let food = category("Food", None);
        let groceries = category("Groceries", Some(food.id));
        let veggies = category("Veggies", Some(groceries.id));
        let travel = category("Travel", None);

        let forest = build_forest(vec![
            food.clone(),
            groceries.clone(),
            veggies.clone(),
            travel.clone(),
        ]);

        assert_eq!(forest.len(), 2);
        let food_node = forest
            .iter()
            .find(|node| node.category.id == food.id)
            .unwrap();
        assert_eq!(food_node.children.len(), 1);
        assert_eq!(food_node.children[0].category.id, groceries.id);
        assert_eq!(food_node.children[0].children[0].category.id, veggies.id);
    }
}
