// SeaORM entities for users, treds and the two ordered reference lists
// (`user.treds`, `tred.children`) kept as link tables.

pub mod tred;
pub mod tred_child;
pub mod user;
pub mod user_tred;


pub mod prelude {
    pub use super::tred::{
        ActiveModel as TredActiveModel, Column as TredColumn, Entity as Tred, Model as TredModel,
    };
    pub use super::tred_child::{
        ActiveModel as TredChildActiveModel, Column as TredChildColumn, Entity as TredChild,
        Model as TredChildModel,
    };
    pub use super::user::{
        ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
    };
    pub use super::user_tred::{
        ActiveModel as UserTredActiveModel, Column as UserTredColumn, Entity as UserTred,
        Model as UserTredModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ActiveValue,
        ColumnTrait,
        ConnectionTrait,

        // Database and connection types
        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbErr,

        // Core traits
        EntityTrait,
        ModelTrait,
        NotSet,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        Related,

        // Active model helpers
        Set,
        TransactionTrait,
        Unchanged,
    };
}
