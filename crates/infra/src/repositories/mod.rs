mod todos;

pub use todos::GraphTodoRepository;
