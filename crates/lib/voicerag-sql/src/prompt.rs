//! System prompt for the NL-to-SQL agent.
//!
//! The schema description and rules are configuration, not code: the default
//! template below is canonical, and deployments may load the same template
//! text from a file instead.

use std::io;
use std::path::Path;

/// Maximum number of rows a generated query may return.
pub const ROW_CAP: usize = 100;

/// Fixed sentence the agent returns when no data satisfies the request.
pub const REFUSAL_SENTENCE: &str =
    "We don't have data available for this request, please try something else!";

const DEFAULT_TEMPLATE: &str = r"You are an AI assistant tasked with generating SQL queries from natural language requests. Use only the schema provided and do not reference any other tables. Always refer to the following table schemas:
CREATE TABLE [dbo].[Customers]([CustomerID] [int] NOT NULL,[CustomerName] [varchar](255) NULL,[Email] [varchar](255) NULL) ON [PRIMARY] GO ALTER TABLE [dbo].[Customers] ADD PRIMARY KEY CLUSTERED ([CustomerID] ASC) WITH (STATISTICS_NORECOMPUTE = OFF, IGNORE_DUP_KEY = OFF, ONLINE = OFF, OPTIMIZE_FOR_SEQUENTIAL_KEY = OFF) ON [PRIMARY] GO.
CREATE TABLE [dbo].[Orders]([OrderID] [int] NOT NULL,[CustomerID] [int] NULL,[OrderDate] [date] NULL,[TotalAmount] [decimal](10, 2) NULL) ON [PRIMARY] GO ALTER TABLE [dbo].[Orders] ADD PRIMARY KEY CLUSTERED ([OrderID] ASC) WITH (STATISTICS_NORECOMPUTE = OFF, IGNORE_DUP_KEY = OFF, ONLINE = OFF, OPTIMIZE_FOR_SEQUENTIAL_KEY = OFF) ON [PRIMARY] GO ALTER TABLE [dbo].[Orders] WITH CHECK ADD FOREIGN KEY([CustomerID]) REFERENCES [dbo].[Customers] ([CustomerID]) GO.
Use this schema to generate accurate SQL queries based on the natural language input provided.
If the request cannot be fulfilled with the available data, respond with - We don't have data available for this request, please try something else! but don't show all internal attempts to generate the response.
Always make sure the query returns not more than 100 best rows so the results stay within context length when passed back to the model.
Do not add ``` or backticks to the SQL query that you are generating. The query is for Azure SQL so don't add LIMIT, instead use TOP or OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY.
To run a query, reply with a single line starting with 'SQL: ' followed by the statement. The result rows will be sent back to you. When you know the final answer, reply with a single line starting with 'ANSWER: ' followed by the answer in natural language.
Example Queries:
Query: Give the list of customers who ordered at least once. SQL: SELECT TOP 10 CustomerName FROM dbo.Customers WHERE CustomerID IN (SELECT DISTINCT CustomerID FROM dbo.Orders) ORDER BY CustomerID;
Query: Give me the list of customers who ordered twice. SQL: SELECT C.CustomerID, C.CustomerName, C.Email FROM dbo.Customers C JOIN dbo.Orders O ON C.CustomerID = O.CustomerID GROUP BY C.CustomerID, C.CustomerName, C.Email HAVING COUNT(O.OrderID) = 2;
Query: How can I retrieve the names and emails of all customers who have placed an order? SQL: SELECT DISTINCT c.CustomerName, c.Email FROM Customers c JOIN Orders o ON c.CustomerID = o.CustomerID;";

/// System prompt supplied to every SQL-generation conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlPromptTemplate {
    system: String,
}

impl SqlPromptTemplate {
    /// Loads a template from a file, for deployments overriding the schema
    /// description without a code change.
    ///
    /// # Errors
    /// Returns `io::Error` if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let system = std::fs::read_to_string(path)?;
        Ok(Self { system })
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system
    }
}

impl Default for SqlPromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
