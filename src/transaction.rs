//! Batch and per-item transaction scopes.
//!
//! A [`BatchScope`] is the single outer transaction of an import run. Each
//! record gets an [`ItemScope`], a named savepoint inside the batch that is
//! either released into the batch or rolled back on its own. Dropping a scope
//! without finishing it rolls it back.
//!
//! Failures of the outer scope are [`RouteError::Batch`] or
//! [`RouteError::BatchCommit`]; failures confined to one item stay
//! [`RouteError::Persistence`].

use rusqlite::{Connection, Savepoint, Transaction};

use crate::error::{Result, RouteError};

/// Outer unit of work for one batch.
pub struct BatchScope<'c> {
    tx: Transaction<'c>,
}

impl<'c> BatchScope<'c> {
    pub fn begin(conn: &'c mut Connection) -> Result<Self> {
        Ok(Self {
            tx: conn.transaction().map_err(RouteError::Batch)?,
        })
    }

    /// Connection view for work that belongs to the batch itself.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    /// Open the savepoint for item `index`.
    pub fn item(&mut self, index: usize) -> Result<ItemScope<'_>> {
        let sp = self.tx.savepoint_with_name(format!("import_item_{}", index))?;
        Ok(ItemScope { sp })
    }

    /// Commit everything released into the batch.
    ///
    /// On failure the transaction is rolled back as a whole and the error is
    /// reported as [`RouteError::BatchCommit`].
    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(RouteError::BatchCommit)
    }
}

/// Savepoint isolating one item inside a batch.
pub struct ItemScope<'t> {
    sp: Savepoint<'t>,
}

impl ItemScope<'_> {
    pub fn conn(&self) -> &Connection {
        &self.sp
    }

    /// Keep the item's writes as part of the batch. On failure the item's
    /// writes are discarded and the batch stays usable.
    pub fn release(self) -> Result<()> {
        self.sp.commit()?;
        Ok(())
    }

    /// Discard the item's writes; the batch itself stays open.
    ///
    /// If the savepoint cannot be rolled back the batch may hold the item's
    /// partial writes, so the error is [`RouteError::Batch`].
    pub fn rollback(mut self) -> Result<()> {
        self.sp.rollback().map_err(RouteError::Batch)?;
        self.sp.commit().map_err(RouteError::Batch)?;
        Ok(())
    }
}
