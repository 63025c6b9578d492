mod chats;
mod follows;
mod pagination;
mod transactions;
