use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::stream::BoxStream;
use futures_core::Stream;
use futures_util::stream;
use hashbrown::HashMap;

use crate::column::MySqlColumn;
use crate::connection::stream::Waiting;
use crate::connection::MySqlConnection;
use crate::error::Result;
use crate::protocol::statement::{BinaryRow, Execute, Prepare, PrepareOk, StmtClose};
use crate::protocol::text::{ColumnDefinition, Query, TextRow};
use crate::protocol::{Packet, Status};
use crate::query_result::{MySqlQueryResult, MySqlResultSet};
use crate::row::MySqlRow;
use crate::statement::MySqlStatement;
use crate::type_info::MySqlTypeInfo;
use crate::value::MySqlValueFormat;
use crate::MySqlArgument;

// Metadata of the result set currently being read.
pub(crate) struct ResultMeta {
    columns: Arc<Vec<MySqlColumn>>,
    column_names: Arc<HashMap<String, usize>>,
}

impl MySqlConnection {
    /// Send a text-protocol query and collect every result set.
    pub(crate) async fn raw_query(&mut self, sql: &str) -> Result<MySqlQueryResult> {
        self.ensure_open()?;

        let result = self.raw_query_inner(sql).await;
        self.finish_command(result)
    }

    async fn raw_query_inner(&mut self, sql: &str) -> Result<MySqlQueryResult> {
        self.stream.wait_until_ready().await?;
        self.stream.send_packet(Query(sql)).await?;
        self.stream.pending.push_back(Waiting::Result);

        self.collect_results(MySqlValueFormat::Text).await
    }

    /// Execute a prepared statement and collect every result set.
    pub(crate) async fn raw_execute(
        &mut self,
        statement_id: u32,
        arguments: &[MySqlArgument],
    ) -> Result<MySqlQueryResult> {
        self.ensure_open()?;

        let result = self.raw_execute_inner(statement_id, arguments).await;
        self.finish_command(result)
    }

    async fn raw_execute_inner(
        &mut self,
        statement_id: u32,
        arguments: &[MySqlArgument],
    ) -> Result<MySqlQueryResult> {
        self.stream.wait_until_ready().await?;
        self.stream
            .send_packet(Execute {
                statement_id,
                arguments,
            })
            .await?;
        self.stream.pending.push_back(Waiting::Result);

        self.collect_results(MySqlValueFormat::Binary).await
    }

    /// Prepare a statement server-side.
    pub(crate) async fn raw_prepare(&mut self, sql: &str) -> Result<MySqlStatement> {
        self.ensure_open()?;

        let result = self.raw_prepare_inner(sql).await;
        self.finish_command(result)
    }

    async fn raw_prepare_inner(&mut self, sql: &str) -> Result<MySqlStatement> {
        self.stream.wait_until_ready().await?;
        self.stream.send_packet(Prepare { query: sql }).await?;
        self.stream.pending.push_back(Waiting::Prepare);

        let ok: PrepareOk = self.stream.recv().await?;

        // the parameter definitions carry no type information the binary
        // bind would honor; consume and discard them
        if ok.params > 0 {
            for _ in 0..ok.params {
                let _def: ColumnDefinition = self.stream.recv().await?;
            }

            self.stream.recv_packet().await?.eof()?;
        }

        let mut columns = Vec::with_capacity(usize::from(ok.columns));

        if ok.columns > 0 {
            for ordinal in 0..usize::from(ok.columns) {
                let def: ColumnDefinition = self.stream.recv().await?;

                columns.push(MySqlColumn::new(
                    ordinal,
                    def.display_name().to_owned(),
                    MySqlTypeInfo::from_column(&def),
                ));
            }

            self.stream.recv_packet().await?.eof()?;
        }

        self.stream.pending.pop_front();

        Ok(MySqlStatement {
            id: ok.statement_id,
            parameters: usize::from(ok.params),
            columns: Arc::new(columns),
        })
    }

    /// Read result sets until the server stops setting
    /// `SERVER_MORE_RESULTS_EXISTS`, chaining them in arrival order.
    async fn collect_results(&mut self, format: MySqlValueFormat) -> Result<MySqlQueryResult> {
        let mut sets = Vec::with_capacity(1);

        loop {
            let packet = self.stream.recv_packet().await?;

            if packet.is_ok() {
                // no rows at all for this statement
                let ok = packet.ok()?;

                sets.push(MySqlResultSet {
                    affected_rows: ok.affected_rows,
                    last_insert_id: ok.last_insert_id,
                    columns: Arc::new(Vec::new()),
                    column_names: Arc::new(HashMap::new()),
                    rows: Vec::new(),
                });

                if ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                    continue;
                }

                self.stream.pending.pop_front();
                return Ok(MySqlQueryResult { sets });
            }

            let meta = self.recv_result_metadata(packet).await?;

            let mut rows = Vec::new();

            loop {
                let packet = self.stream.recv_packet().await?;

                if packet.is_eof() {
                    let eof = packet.eof()?;

                    sets.push(MySqlResultSet {
                        affected_rows: 0,
                        last_insert_id: 0,
                        columns: Arc::clone(&meta.columns),
                        column_names: Arc::clone(&meta.column_names),
                        rows,
                    });

                    if eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                        break;
                    }

                    self.stream.pending.pop_front();
                    return Ok(MySqlQueryResult { sets });
                }

                rows.push(decode_row(packet, format, &meta)?);
            }
        }
    }

    // Column-count packet is in hand; read the column definitions and the
    // EOF that terminates them.
    async fn recv_result_metadata(&mut self, packet: Packet) -> Result<ResultMeta> {
        use crate::io::MySqlBufExt;

        let mut buf = packet.0;
        let num_columns = buf.get_uint_lenenc();

        let num_columns = usize::try_from(num_columns)
            .map_err(|_| err_protocol!("column count {num_columns} overflows usize"))?;

        let mut columns = Vec::with_capacity(num_columns);

        for ordinal in 0..num_columns {
            let def: ColumnDefinition = self.stream.recv().await?;

            columns.push(MySqlColumn::new(
                ordinal,
                def.display_name().to_owned(),
                MySqlTypeInfo::from_column(&def),
            ));
        }

        self.stream.recv_packet().await?.eof()?;

        let column_names = names_of(&columns);

        Ok(ResultMeta {
            columns: Arc::new(columns),
            column_names: Arc::new(column_names),
        })
    }

    /// Send a query and hand back the first result set as a row stream.
    ///
    /// Rows are pulled off the socket as the stream is polled. Multi-result
    /// queries cannot be streamed; a trailing EOF announcing another result
    /// set yields a protocol error.
    pub(crate) async fn raw_fetch(
        &mut self,
        sql: &str,
        arguments: Option<(u32, &[MySqlArgument])>,
    ) -> Result<MySqlRowStream<'_>> {
        self.ensure_open()?;

        let format = match arguments {
            Some(_) => MySqlValueFormat::Binary,
            None => MySqlValueFormat::Text,
        };

        let head = self.raw_fetch_head(sql, arguments).await;
        let meta = self.finish_command(head)?;

        Ok(match meta {
            None => MySqlRowStream {
                columns: Arc::new(Vec::new()),
                inner: Box::pin(stream::empty()),
            },

            Some(meta) => MySqlRowStream {
                columns: Arc::clone(&meta.columns),
                inner: Box::pin(stream::try_unfold(
                    (self, meta),
                    move |(conn, meta)| async move {
                        match conn.next_streamed_row(format, &meta).await {
                            Ok(Some(row)) => Ok(Some((row, (conn, meta)))),
                            Ok(None) => Ok(None),
                            Err(err) => Err(err),
                        }
                    },
                )),
            },
        })
    }

    async fn raw_fetch_head(
        &mut self,
        sql: &str,
        arguments: Option<(u32, &[MySqlArgument])>,
    ) -> Result<Option<ResultMeta>> {
        self.stream.wait_until_ready().await?;

        match arguments {
            Some((statement_id, arguments)) => {
                self.stream
                    .send_packet(Execute {
                        statement_id,
                        arguments,
                    })
                    .await?;
            }
            None => self.stream.send_packet(Query(sql)).await?,
        }

        self.stream.pending.push_back(Waiting::Result);

        let packet = self.stream.recv_packet().await?;

        if packet.is_ok() {
            let ok = packet.ok()?;

            if ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                return Err(err_protocol!(
                    "multi-result queries cannot be streamed; use `execute`"
                ));
            }

            self.stream.pending.pop_front();

            return Ok(None);
        }

        self.recv_result_metadata(packet).await.map(Some)
    }

    // One step of a streamed result set: a row, or `None` at EOF.
    async fn next_streamed_row(
        &mut self,
        format: MySqlValueFormat,
        meta: &ResultMeta,
    ) -> Result<Option<MySqlRow>> {
        let step = async {
            let packet = self.stream.recv_packet().await?;

            if packet.is_eof() {
                let eof = packet.eof()?;

                if eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                    return Err(err_protocol!(
                        "multi-result queries cannot be streamed; use `execute`"
                    ));
                }

                self.stream.pending.pop_front();

                return Ok(None);
            }

            decode_row(packet, format, meta).map(Some)
        }
        .await;

        self.finish_command(step)
    }

    /// Queue `COM_STMT_CLOSE` for a statement evicted from the cache; it is
    /// flushed with the next command (the server sends no reply).
    pub(crate) fn queue_stmt_close(&mut self, statement_id: u32) -> Result<()> {
        self.stream.sequence_id = 0;
        self.stream.write_packet(StmtClose { statement_id })
    }
}

fn decode_row(packet: Packet, format: MySqlValueFormat, meta: &ResultMeta) -> Result<MySqlRow> {
    let values = match format {
        MySqlValueFormat::Text => packet.decode_with::<TextRow, _>(meta.columns.len())?.values,
        MySqlValueFormat::Binary => {
            packet
                .decode_with::<BinaryRow, _>(meta.columns.as_slice())?
                .values
        }
    };

    Ok(MySqlRow {
        values,
        format,
        columns: Arc::clone(&meta.columns),
        column_names: Arc::clone(&meta.column_names),
    })
}

fn names_of(columns: &[MySqlColumn]) -> HashMap<String, usize> {
    columns
        .iter()
        .map(|c| (c.name().to_lowercase(), c.ordinal()))
        .collect()
}

/// A streamed result set: rows arrive as the stream is polled, instead of
/// being materialized up front.
pub struct MySqlRowStream<'c> {
    columns: Arc<Vec<MySqlColumn>>,
    inner: BoxStream<'c, Result<MySqlRow>>,
}

impl MySqlRowStream<'_> {
    /// The output columns of the streamed result set.
    #[must_use]
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }
}

impl Stream for MySqlRowStream<'_> {
    type Item = Result<MySqlRow>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
