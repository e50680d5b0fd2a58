//! User-facing texts.

pub const GREETING: &str = "👋 Привет! Я бот-планировщик для Google Calendar.\n\n\
Я могу помочь вам:\n\
✅ Создавать события (например: 'назначь встречу на завтра в 15:00')\n\
📅 Просматривать события (например: 'покажи события на 27 ноября')\n\
❌ Удалять события (например: 'удали встречу с Вадимом')\n\n\
Просто напишите мне вашу задачу естественным языком!";

pub const NOT_UNDERSTOOD: &str = "Извините, я не понял вашу команду. \
Попробуйте сказать, например:\n\
- Создать событие: 'назначь встречу на завтра в 15:00'\n\
- Показать события: 'покажи события на 27 ноября'\n\
- Удалить событие: 'удали встречу с Вадимом'";

pub const TRY_REPHRASING: &str =
    "Извините, произошла ошибка при обработке вашего запроса. Попробуйте переформулировать.";

pub const CONFIRM_PROMPT: &str = "Правильно ли я понял? (Да / Нет)";
pub const ANSWER_YES_OR_NO: &str = "Пожалуйста, ответьте 'Да' или 'Нет'.";
pub const RESTATE_WITH_DETAIL: &str =
    "Понятно. Пожалуйста, переформулируйте ваш запрос более подробно.";
pub const CLARIFICATIONS_DONE: &str =
    "Спасибо за уточнения.\nПожалуйста, повторите ваш запрос с учетом уточнений.";

pub const CREATE_FAILED: &str =
    "❌ Не удалось создать событие. Проверьте правильность данных и попробуйте снова.";
pub const LIST_NEEDS_DATE: &str = "Пожалуйста, укажите дату для просмотра событий. \
Например: 'покажи события на 27 ноября' или '/view 2025-11-27'";
pub const LIST_FAILED: &str = "❌ Не удалось получить список событий. Попробуйте позже.";
pub const DELETE_NEEDS_TITLE: &str =
    "Для удаления события необходимо указать его название. Пожалуйста, уточните.";
pub const DELETE_SEARCH_FAILED: &str = "❌ Не удалось найти события. Попробуйте позже.";
pub const DELETED: &str = "✅ Событие удалено.";
pub const DELETE_FAILED: &str = "❌ Не удалось удалить событие.";
pub const DELETE_ID_FAILED: &str = "❌ Не удалось удалить событие. Проверьте ID.";
pub const DELETE_CANCELLED: &str = "Хорошо, событие не будет удалено.";
pub const DELETE_CONFIRM_PROMPT: &str = "Удалить это событие? (Да / Нет)";
pub const UNTITLED: &str = "Без названия";
pub const ALL_DAY: &str = "весь день";

pub const ADD_USAGE: &str =
    "Использование: /add <текст>\nПример: /add назначь встречу на завтра в 15:00";
pub const VIEW_USAGE: &str = "Использование: /view YYYY-MM-DD\nПример: /view 2025-11-27";
pub const DELETE_USAGE: &str = "Использование: /delete <event_id|название>\n\
Пример: /delete abc123 или /delete встреча с Вадимом";
