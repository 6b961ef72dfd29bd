// Static lookup of the carrier's operation codes, shared by single history
// (OperType/OperAttr) and batch answers (OperTypeID/OperCtgID)
use crate::model::{BatchOperation, OperationCode, TrackingRecord};

pub fn operation_type_name(type_id: u32) -> Option<&'static str> {
    let name = match type_id {
        1 => "Приём",
        2 => "Вручение",
        3 => "Возврат",
        4 => "Досылка почты",
        5 => "Невручение",
        6 => "Хранение",
        7 => "Временное хранение",
        8 => "Обработка",
        9 => "Импорт международной почты",
        10 => "Экспорт международной почты",
        11 => "Приём на таможню",
        12 => "Неудачная попытка вручения",
        13 => "Регистрация отправки",
        14 => "Таможенное оформление",
        15 => "Передача на временное хранение",
        16 => "Уничтожение",
        17 => "Оформление прав собственности",
        18 => "Регистрация утраты",
        19 => "Таможенные платежи поступили",
        20 => "Регистрация",
        21 => "Доставка",
        22 => "Недоставка",
        23 => "Поступление на временное хранение",
        24 => "Продление срока выпуска таможней",
        25 => "Вскрытие",
        26 => "Отмена",
        27 => "Получена электронная регистрация",
        28 => "Присвоение идентификатора",
        29 => "Регистрация прохождения в ММПО",
        30 => "Отправка SRM",
        31 => "Обработка перевозчиком",
        32 => "Поступление АПО",
        33 => "Международная обработка",
        34 => "Электронное уведомление загружено",
        35 => "Отказ в курьерской доставке",
        36 => "Уточнение адреса",
        37 => "Предварительное оформление",
        38 => "Задержка для уточнений у отправителя",
        39 | 40 => "Таможенный контроль",
        41 => "Обработка отправления",
        42 | 43 => "Вручение разрешено",
        _ => return None,
    };
    Some(name)
}

pub fn operation_attr_name(type_id: u32, attr_id: u32) -> Option<&'static str> {
    let name = match (type_id, attr_id) {
        (1, 1) => "Единичный",
        (1, 2) => "Партионный",
        (1, 3) => "Партионный электронно",
        (1, 4) => "Упрощенный предзаполненный",
        (1, 5) => "Упрощенный предоплаченный",

        (2, 1) => "Вручение адресату",
        (2, 2) => "Вручение отправителю",
        (2, 3) => "Выдано адресату через почтомат",
        (2, 4) => "Выдано отправителю через почтомат",
        (2, 5) => "Адресату электронно",
        (2, 6) => "Адресату почтальоном",
        (2, 7) => "Отправителю почтальоном",
        (2, 8) => "Адресату курьером",
        (2, 9) => "Отправителю курьером",
        (2, 10) => "Адресату с контролем ответа",

        (3, 1) => "Истек срок хранения",
        (3, 2) => "Заявление отправителя",
        (3, 3) => "Отсутствие адресата по указанному адресу",
        (3, 4) => "Отказ адресата",
        (3, 5) => "Смерть адресата",
        (3, 6) => "Невозможно прочесть адрес адресата",
        (3, 7) => "Отказ в выпуске таможней",
        (3, 8) => "Адресат, абонирующий абонементный почтовый шкаф, не указан или указан неправильно",
        (3, 9) => "Иные обстоятельства",
        (3, 10) => "Неверный адрес",

        (4, 1) => "По заявлению адресата",
        (4, 2) => "Улучшение адреса",
        (4, 3) => "Засылка",
        (4, 4) => "На новый адрес",

        (5, 1) => "Утрачено",
        (5, 2) => "Изъято",
        (5, 3) => "Засылка",

        (6, 1) => "До востребования",
        (6, 2) => "На абонементный ящик",
        (6, 3) => "Установленный срок хранения",
        (6, 4) => "Продление срока хранения по заявлению адресата",
        (6, 5) => "Продление срока хранения по заявлению отправителя",

        (7, 1) => "Нероздано",
        (7, 2) => "Невостребованное",
        (7, 3) => "Содержимое запрещено к пересылке",

        (8, 0) => "Сортировка",
        (8, 1) => "Покинуло место приёма",
        (8, 2) => "Прибыло в место вручения",
        (8, 3) => "Прибыло в сортировочный центр",
        (8, 4) => "Покинуло сортировочный центр",
        (8, 5) => "Прибыло в место международного обмена",
        (8, 6) => "Покинуло место международного обмена",
        (8, 7) => "Прибыло в место транзита",
        (8, 8) => "Покинуло место транзита",
        (8, 9) => "Прибыло в почтомат",
        (8, 10) => "Истекает срок хранения в почтомате",
        (8, 11) => "Переадресовано в почтомат",
        (8, 12) => "Изъято из почтомата",
        (8, 13) => "Прибыло на территорию РФ",
        (8, 14) => "Прибыло в Центр выдачи посылок",
        (8, 15) => "Передано курьеру",
        (8, 16) => "Доставлено для вручения электронно",

        (12, 1) => "Временное отсутствие адресата",
        (12, 2) => "Доставка отложена по просьбе адресата",
        (12, 3) => "Неполный адрес",
        (12, 4) => "Неправильный адрес",
        (12, 5) => "Адресат выбыл",
        (12, 6) => "Адресат отказался от отправления",
        (12, 7) => "Обстоятельства непреодолимой силы",
        (12, 8) => "Иная",
        (12, 9) => "Адресат заберет отправление сам",
        (12, 10) => "Нет адресата",

        (14, 1) => "Выпущено таможней",
        (14, 2) => "Возвращено таможней",
        (14, 3) => "Осмотрено таможней",
        (14, 4) => "Отказ в выпуске",
        (14, 5) => "Направлено с таможенным уведомлением",
        (14, 6) => "Направлено с обязательной уплатой таможенных платежей",
        _ => return None,
    };
    Some(name)
}

// A dictionary hit wins; otherwise whatever name the carrier sent is kept.
fn enrich_code(code: OperationCode, lookup: Option<&'static str>) -> OperationCode {
    match lookup {
        Some(name) => OperationCode::new(code.id, Some(name.to_string())),
        None => code,
    }
}

pub fn enrich_history_record(mut record: TrackingRecord) -> TrackingRecord {
    let type_id = record.operation_type.id;
    let type_name = type_id.and_then(operation_type_name);
    let attr_name = match (type_id, record.operation_attr.id) {
        (Some(t), Some(a)) => operation_attr_name(t, a),
        _ => None,
    };

    record.operation_type = enrich_code(record.operation_type, type_name);
    record.operation_attr = enrich_code(record.operation_attr, attr_name);
    record
}

pub fn enrich_batch_operation(mut operation: BatchOperation) -> BatchOperation {
    let type_id = operation.oper_type.id;
    let type_name = type_id.and_then(operation_type_name);
    let ctg_name = match (type_id, operation.oper_ctg.id) {
        (Some(t), Some(c)) => operation_attr_name(t, c),
        _ => None,
    };

    operation.oper_type = enrich_code(operation.oper_type, type_name);
    operation.oper_ctg = enrich_code(operation.oper_ctg, ctg_name);
    operation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use test_case::test_case;

    fn record(type_id: Option<u32>, attr_id: Option<u32>) -> TrackingRecord {
        TrackingRecord {
            barcode: "80081234567890".to_string(),
            operation_type: OperationCode::new(type_id, None),
            operation_attr: OperationCode::new(attr_id, None),
            operation_date: None,
            timestamp: None,
            location: Location::default(),
            destination: None,
            item_name: None,
            mass: None,
            mail_type: None,
            mail_category: None,
            sender: None,
            recipient: None,
        }
    }

    #[test_case(1, "Приём"; "acceptance")]
    #[test_case(2, "Вручение"; "delivery")]
    #[test_case(8, "Обработка"; "processing")]
    #[test_case(40, "Таможенный контроль"; "customs control alias")]
    fn test_known_operation_types(type_id: u32, expected: &str) {
        assert_eq!(operation_type_name(type_id), Some(expected));
    }

    #[test]
    fn test_attribute_depends_on_type() {
        assert_eq!(operation_attr_name(2, 1), Some("Вручение адресату"));
        assert_eq!(operation_attr_name(3, 1), Some("Истек срок хранения"));
        assert_eq!(operation_attr_name(9, 1), None);
    }

    #[test]
    fn test_enrichment_is_deterministic() {
        let first = enrich_history_record(record(Some(8), Some(2)));
        let second = enrich_history_record(record(Some(8), Some(2)));
        assert_eq!(first, second);
        assert_eq!(first.operation_type.name.as_deref(), Some("Обработка"));
        assert_eq!(first.operation_attr.name.as_deref(), Some("Прибыло в место вручения"));
    }

    #[test]
    fn test_unknown_codes_stay_unnamed() {
        let enriched = enrich_history_record(record(Some(999), Some(42)));
        assert_eq!(enriched.operation_type, OperationCode::new(Some(999), None));
        assert_eq!(enriched.operation_attr, OperationCode::new(Some(42), None));

        let missing = enrich_history_record(record(None, None));
        assert!(missing.operation_type.name.is_none());
    }

    #[test]
    fn test_carrier_name_kept_for_unknown_code() {
        let mut raw = record(Some(999), None);
        raw.operation_type.name = Some("Новая операция".to_string());
        let enriched = enrich_history_record(raw);
        assert_eq!(enriched.operation_type.name.as_deref(), Some("Новая операция"));
    }

    #[test]
    fn test_enrich_batch_operation() {
        let operation = BatchOperation {
            oper_type: OperationCode::new(Some(2), None),
            oper_ctg: OperationCode::new(Some(1), None),
            ..Default::default()
        };
        let enriched = enrich_batch_operation(operation);
        assert_eq!(enriched.oper_type.name.as_deref(), Some("Вручение"));
        assert_eq!(enriched.oper_ctg.name.as_deref(), Some("Вручение адресату"));
    }
}
