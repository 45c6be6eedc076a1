use futures_core::future::BoxFuture;

use crate::connection::MySqlConnection;
use crate::error::{Error, Result};

impl MySqlConnection {
    /// Open a transaction. Fails with [`Error::NestedTransaction`] when one
    /// is already open on this session.
    pub async fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::NestedTransaction);
        }

        self.execute("START TRANSACTION").await?;
        self.in_transaction = true;

        Ok(())
    }

    /// Commit the open transaction.
    pub async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await?;
        self.in_transaction = false;

        Ok(())
    }

    /// Roll the open transaction back.
    pub async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await?;
        self.in_transaction = false;

        Ok(())
    }

    /// Run `f` inside a transaction.
    ///
    /// On success exactly one `COMMIT` is sent; when `f` (or the commit)
    /// fails, exactly one `ROLLBACK` is sent and the error is returned.
    ///
    /// ```no_run
    /// # async fn example(conn: &mut myco::MySqlConnection) -> Result<(), myco::Error> {
    /// conn.transactional(|conn| {
    ///     Box::pin(async move {
    ///         conn.execute("UPDATE account SET balance = balance - 10 WHERE id = 1").await?;
    ///         conn.execute("UPDATE account SET balance = balance + 10 WHERE id = 2").await?;
    ///         Ok(())
    ///     })
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut MySqlConnection) -> BoxFuture<'c, Result<T>>,
    {
        self.begin().await?;

        let result = match f(self).await {
            Ok(value) => self.commit().await.map(|()| value),
            Err(err) => Err(err),
        };

        match result {
            Ok(value) => Ok(value),

            Err(err) => {
                // the original error is the interesting one; a rollback
                // failure is traced but not surfaced over it
                if self.is_connected() {
                    if let Err(rollback_err) = self.rollback().await {
                        tracing::warn!("failed to roll back transaction: {rollback_err}");
                    }
                }

                // the server rolls back implicitly when the session died,
                // and a failed rollback abandons the transaction either way
                self.in_transaction = false;

                Err(err)
            }
        }
    }
}
